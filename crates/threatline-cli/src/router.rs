// Command routing and dispatch

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::*;
use crate::error::CliResult;

/// Threatline - threat models from source code annotations
#[derive(Parser, Debug)]
#[command(name = "threatline")]
#[command(bin_name = "threatline")]
#[command(about = "Build a threat model from @-annotations in source comments")]
#[command(
    long_about = "Threatline scans source comments for @component, @threat, @control and relation directives such as @mitigates or @exposes, keeps the resulting graph in threatmodel/ and renders it as markdown.\n\nQuick start:\n  threatline init     Create threatline.yaml\n  threatline run      Scan sources and update threatmodel/\n  threatline report   Write ThreatModel.md"
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project directory holding threatline.yaml
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a default threatline.yaml and the threatmodel/ directory
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Scan the configured sources and rewrite the stored threat model
    Run {
        /// Merge into the stored threat model instead of rebuilding it
        #[arg(long)]
        merge: bool,
    },

    /// Render the stored threat model as markdown
    Report {
        /// Output file, relative to the project directory
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Command router
pub struct CommandRouter;

impl CommandRouter {
    /// Parse arguments, set up logging and run the chosen command
    pub fn route() -> CliResult<()> {
        let cli = Cli::parse();
        crate::logging::init_logging(&cli.log_level, cli.quiet)?;
        Self::execute(&cli)
    }

    /// Execute a parsed command line
    pub fn execute(cli: &Cli) -> CliResult<()> {
        let dir = cli.project_dir.clone();
        match &cli.command {
            Commands::Init { force } => InitCommand::new(dir).with_force(*force).execute(),
            Commands::Run { merge } => RunCommand::new(dir)
                .with_quiet(cli.quiet)
                .with_merge(*merge)
                .execute(),
            Commands::Report { output } => {
                let mut cmd = ReportCommand::new(dir).with_quiet(cli.quiet);
                if let Some(output) = output {
                    cmd = cmd.with_output(output.clone());
                }
                cmd.execute()
            }
        }
    }
}
