// CLI errors and their user-facing messages

use thiserror::Error;
use threatline_config::ConfigError;
use threatline_core::GraphError;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Threat model error: {0}")]
    Graph(#[from] GraphError),

    #[error("Failed to import library {import}: {source}")]
    Import {
        import: String,
        #[source]
        source: GraphError,
    },

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!(
                    "Invalid argument: {}\n\nRun 'threatline --help' for usage information.",
                    message
                )
            }
            CliError::Io(e) => format!("File operation failed: {}", e),
            CliError::Config(ConfigError::NotFound(path)) => format!(
                "No configuration found at {}\n\nRun 'threatline init' to create one.",
                path
            ),
            CliError::Config(ConfigError::AlreadyExists(path)) => format!(
                "Configuration already exists at {}\n\nUse 'threatline init --force' to overwrite it.",
                path
            ),
            CliError::Config(e) => {
                format!("Configuration error: {}\n\nCheck threatline.yaml.", e)
            }
            CliError::Graph(e) if e.is_missing() => format!(
                "{}\n\nRun 'threatline run' to generate the threat model first.",
                e
            ),
            CliError::Graph(GraphError::CorruptData { document, source }) => format!(
                "{} could not be decoded: {}\n\nRestore it from version control or delete the threatmodel/ directory and run again.",
                document, source
            ),
            CliError::Graph(e) => format!("Threat model error: {}", e),
            CliError::Import { import, source } if source.is_missing() => format!(
                "Import '{}' has no stored threat model: {}\n\nCheck the imports list in threatline.yaml.",
                import, source
            ),
            CliError::Import { import, source } => {
                format!("Failed to import library '{}': {}", import, source)
            }
            CliError::Scan(msg) => format!("Source scan failed: {}", msg),
            CliError::Internal(msg) => {
                format!("Internal error: {}\n\nPlease report this issue.", msg)
            }
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
