//! Configuration manager implementation

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::{debug, info};

use crate::{
    error::{ConfigError, Result},
    types::{ProjectConfig, DEFAULT_CONFIG_FILE},
};

/// Loads, validates and writes `threatline.yaml`
pub struct ConfigManager {
    /// Configuration file path
    config_path: PathBuf,
    /// Environment prefix
    env_prefix: String,
}

impl ConfigManager {
    /// Manager for `threatline.yaml` in the current directory
    pub fn new() -> Self {
        Self::with_path(PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Create with custom config path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: "THREATLINE".to_string(),
        }
    }

    /// Configuration file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration file, layering `THREATLINE_*` environment overrides on top
    pub fn load(&self) -> Result<ProjectConfig> {
        if !self.config_path.is_file() {
            return Err(ConfigError::NotFound(
                self.config_path.display().to_string(),
            ));
        }

        let config = Config::builder()
            .add_source(File::from(self.config_path.clone()).format(FileFormat::Yaml))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        let project: ProjectConfig = config.try_deserialize()?;
        self.validate(&project)?;

        debug!(path = %self.config_path.display(), "Loaded project configuration");
        Ok(project)
    }

    /// Write `config` to the configuration file
    pub fn save(&self, config: &ProjectConfig) -> Result<()> {
        let yaml = serde_yaml::to_string(config)?;
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.config_path, yaml)?;
        Ok(())
    }

    /// Write the default configuration; refuses to overwrite unless `force` is set
    pub fn write_default(&self, force: bool) -> Result<ProjectConfig> {
        if self.config_path.exists() && !force {
            return Err(ConfigError::AlreadyExists(
                self.config_path.display().to_string(),
            ));
        }
        let config = ProjectConfig::default();
        self.save(&config)?;
        info!(path = %self.config_path.display(), "Wrote default configuration");
        Ok(config)
    }

    /// Check the invariants the scanner relies on
    pub fn validate(&self, config: &ProjectConfig) -> Result<()> {
        if config.project.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "project.name must not be empty".to_string(),
            ));
        }
        if config.paths.is_empty() {
            return Err(ConfigError::Validation(
                "at least one scan path is required".to_string(),
            ));
        }
        if config.paths.iter().any(|p| p.path().trim().is_empty()) {
            return Err(ConfigError::Validation(
                "scan paths must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
