//! Threatline project configuration
//!
//! Reads `threatline.yaml` (project identity, scan roots, extensions and library imports)
//! with `THREATLINE_*` environment overrides layered on top.

pub mod error;
pub mod manager;
pub mod types;

pub use error::{ConfigError, Result};
pub use manager::ConfigManager;
pub use types::{PathEntry, ProjectConfig, ProjectInfo, DEFAULT_CONFIG_FILE};
