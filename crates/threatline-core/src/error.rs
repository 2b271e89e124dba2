//! Error types for threat graph persistence
//!
//! Parsing never fails: malformed directives are skipped. Only loading and saving the
//! persisted documents can produce a [`GraphError`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while saving or loading a threat graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// A required document is absent from the store directory
    #[error("Missing graph document {document}: {path} does not exist")]
    MissingData {
        /// Document file name (e.g. `threats.json`)
        document: &'static str,
        /// Full path that was looked up
        path: PathBuf,
    },

    /// A document exists but does not decode into the expected shape
    #[error("Corrupt graph document {document}: {source}")]
    CorruptData {
        /// Document file name (e.g. `threats.json`)
        document: &'static str,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// IO error while reading or writing a document
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Encoding the graph to JSON failed
    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl GraphError {
    /// Create a missing document error
    pub fn missing(document: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::MissingData {
            document,
            path: path.into(),
        }
    }

    /// Create a corrupt document error
    pub fn corrupt(document: &'static str, source: serde_json::Error) -> Self {
        Self::CorruptData { document, source }
    }

    /// Whether this error means the persisted graph does not exist (yet)
    pub fn is_missing(&self) -> bool {
        matches!(self, GraphError::MissingData { .. })
    }
}
