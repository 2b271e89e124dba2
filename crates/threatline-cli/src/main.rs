// Threatline CLI entry point

use threatline_cli::{output, router::CommandRouter};

fn main() {
    if let Err(e) = CommandRouter::route() {
        output::print_error(&e.user_message());
        std::process::exit(1);
    }
}
