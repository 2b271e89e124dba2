// Command handlers for the threatline CLI

pub mod init;
pub mod report;
pub mod run;

pub use init::InitCommand;
pub use report::ReportCommand;
pub use run::{RunCommand, RunSummary};

use crate::error::CliResult;

/// Trait for command handlers
pub trait Command {
    /// Execute the command
    fn execute(&self) -> CliResult<()>;
}
