// Render the stored threat model as markdown

use std::path::PathBuf;

use chrono::Utc;
use threatline_config::{ConfigManager, DEFAULT_CONFIG_FILE};
use threatline_core::{GraphStore, DEFAULT_STORE_DIR};
use tracing::info;

use super::Command;
use crate::{
    error::CliResult,
    output::print_success,
    report::{render_report, DEFAULT_REPORT_FILE},
};

/// Load the stored graph and write the markdown report
pub struct ReportCommand {
    pub project_dir: PathBuf,
    pub output: PathBuf,
    pub quiet: bool,
}

impl ReportCommand {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            output: PathBuf::from(DEFAULT_REPORT_FILE),
            quiet: false,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Where the report is written; relative outputs resolve against the project directory
    pub fn output_path(&self) -> PathBuf {
        self.project_dir.join(&self.output)
    }
}

impl Command for ReportCommand {
    fn execute(&self) -> CliResult<()> {
        let config = ConfigManager::with_path(self.project_dir.join(DEFAULT_CONFIG_FILE)).load()?;
        let graph = GraphStore::new(self.project_dir.join(DEFAULT_STORE_DIR)).load()?;

        let markdown = render_report(&graph, &config, Utc::now());
        let path = self.output_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, markdown)?;
        info!(path = %path.display(), run_id = %graph.run_id(), "Wrote report");

        if !self.quiet {
            print_success(&format!("Wrote {}", path.display()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use threatline_config::ProjectConfig;
    use threatline_core::{TextBlock, ThreatGraph};

    fn configured_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        ConfigManager::with_path(dir.path().join(DEFAULT_CONFIG_FILE))
            .save(&ProjectConfig::default())
            .unwrap();
        dir
    }

    #[test]
    fn test_report_requires_stored_graph() {
        let dir = configured_project();
        let result = ReportCommand::new(dir.path()).execute();
        assert!(matches!(result, Err(CliError::Graph(e)) if e.is_missing()));
        assert!(!dir.path().join(DEFAULT_REPORT_FILE).exists());
    }

    #[test]
    fn test_report_written_to_custom_output() {
        let dir = configured_project();
        let mut graph = ThreatGraph::with_run_id("r1");
        graph.parse(&TextBlock::new("@exposes API to SQLi with string-built queries"));
        GraphStore::new(dir.path().join(DEFAULT_STORE_DIR))
            .save(&graph)
            .unwrap();

        ReportCommand::new(dir.path())
            .with_output("docs/TM.md")
            .execute()
            .unwrap();

        let report = std::fs::read_to_string(dir.path().join("docs/TM.md")).unwrap();
        assert!(report.contains("| API | SQLi | string-built queries |  |"));
    }

    #[test]
    fn test_quiet_report_still_writes() {
        let dir = configured_project();
        GraphStore::new(dir.path().join(DEFAULT_STORE_DIR))
            .save(&ThreatGraph::with_run_id("r2"))
            .unwrap();

        let cmd = ReportCommand::new(dir.path()).with_quiet(true);
        assert!(cmd.quiet);
        cmd.execute().unwrap();
        assert!(dir.path().join(DEFAULT_REPORT_FILE).is_file());
    }
}
