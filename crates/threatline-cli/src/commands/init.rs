// Initialize a threatline project

use std::path::PathBuf;

use threatline_config::{ConfigManager, DEFAULT_CONFIG_FILE};
use threatline_core::DEFAULT_STORE_DIR;
use tracing::info;

use super::Command;
use crate::{
    error::CliResult,
    output::{print_success, OutputStyle},
};

/// Write the default configuration and create the store directory
pub struct InitCommand {
    pub project_dir: PathBuf,
    pub force: bool,
}

impl InitCommand {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            force: false,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn show_next_steps(&self) {
        let style = OutputStyle::default();
        println!("{}", style.section("Next steps"));
        println!(
            "{}",
            style.tip("Annotate your code, e.g. // @exposes API to SQLi with string-built queries")
        );
        println!("{}", style.tip("Run 'threatline run' to build the threat model"));
        println!("{}", style.tip("Run 'threatline report' to write ThreatModel.md"));
    }
}

impl Command for InitCommand {
    fn execute(&self) -> CliResult<()> {
        let manager = ConfigManager::with_path(self.project_dir.join(DEFAULT_CONFIG_FILE));
        manager.write_default(self.force)?;

        let store_dir = self.project_dir.join(DEFAULT_STORE_DIR);
        std::fs::create_dir_all(&store_dir)?;
        info!(store = %store_dir.display(), "Initialized project");

        print_success(&format!("Created {}", manager.path().display()));
        self.show_next_steps();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use threatline_config::ConfigError;

    #[test]
    fn test_init_creates_config_and_store() {
        let dir = tempfile::tempdir().unwrap();
        InitCommand::new(dir.path()).execute().unwrap();

        assert!(dir.path().join("threatline.yaml").is_file());
        assert!(dir.path().join("threatmodel").is_dir());
    }

    #[test]
    fn test_init_twice_requires_force() {
        let dir = tempfile::tempdir().unwrap();
        InitCommand::new(dir.path()).execute().unwrap();

        let second = InitCommand::new(dir.path()).execute();
        assert!(matches!(
            second,
            Err(CliError::Config(ConfigError::AlreadyExists(_)))
        ));
        assert!(InitCommand::new(dir.path()).with_force(true).execute().is_ok());
    }
}
