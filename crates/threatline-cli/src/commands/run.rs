// Scan sources and update the stored threat model

use std::path::PathBuf;

use threatline_config::{ConfigManager, ProjectConfig, DEFAULT_CONFIG_FILE};
use threatline_core::store::GRAPH_DOCUMENTS;
use threatline_core::{GraphStore, ThreatGraph, DEFAULT_STORE_DIR};
use tracing::{debug, info};

use super::Command;
use crate::{
    error::{CliError, CliResult},
    output::{print_warning, OutputStyle},
    scanner::SourceScanner,
};

/// Counts reported after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub blocks: usize,
    pub directives: usize,
    pub components: usize,
    pub controls: usize,
    pub threats: usize,
    pub relations: usize,
}

/// Import, scan and save; optionally on top of the stored graph
pub struct RunCommand {
    pub project_dir: PathBuf,
    pub quiet: bool,
    /// Merge into the stored graph instead of rebuilding it from the sources
    pub merge: bool,
}

impl RunCommand {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            quiet: false,
            merge: false,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    /// Run the whole pipeline and return the saved graph
    pub fn run(&self) -> CliResult<(ThreatGraph, RunSummary)> {
        let config = ConfigManager::with_path(self.project_dir.join(DEFAULT_CONFIG_FILE)).load()?;
        let store = GraphStore::new(self.project_dir.join(DEFAULT_STORE_DIR));

        let mut graph = if self.merge {
            self.load_prior(&store)?
        } else {
            ThreatGraph::new()
        };
        let run_id = graph.start_run().to_string();
        info!(run_id = %run_id, project = %config.project.name, "Starting threat model run");

        self.import_libraries(&config, &mut graph)?;

        let blocks = SourceScanner::new(&self.project_dir, &config).scan()?;
        let mut summary = RunSummary {
            blocks: blocks.len(),
            ..RunSummary::default()
        };
        for block in blocks {
            summary.directives += graph.merge(block);
        }

        store.save(&graph)?;

        let registry = graph.registry();
        summary.components = registry.components().len();
        summary.controls = registry.controls().len();
        summary.threats = registry.threats().len();
        summary.relations = graph.relations().len();
        info!(
            directives = summary.directives,
            entities = registry.len(),
            relations = summary.relations,
            "Threat model saved"
        );
        Ok((graph, summary))
    }

    /// The stored graph, or an empty one when nothing has been stored yet
    ///
    /// A store holding only some of its documents is not treated as empty: loading it fails.
    fn load_prior(&self, store: &GraphStore) -> CliResult<ThreatGraph> {
        let any_present = GRAPH_DOCUMENTS
            .iter()
            .any(|document| store.document_path(document).is_file());
        if !any_present {
            debug!(store = %store.dir().display(), "No stored threat model, starting empty");
            return Ok(ThreatGraph::new());
        }
        Ok(store.load()?)
    }

    fn import_libraries(&self, config: &ProjectConfig, graph: &mut ThreatGraph) -> CliResult<()> {
        for import in &config.imports {
            let library_store =
                GraphStore::new(self.project_dir.join(import).join(DEFAULT_STORE_DIR));
            let library = library_store
                .load_library()
                .map_err(|source| CliError::Import {
                    import: import.clone(),
                    source,
                })?;
            info!(
                import = %import,
                entities = library.len(),
                "Imported entity library"
            );
            graph.import_library(library);
        }
        Ok(())
    }
}

impl Command for RunCommand {
    fn execute(&self) -> CliResult<()> {
        let (_, summary) = self.run()?;
        if self.quiet {
            return Ok(());
        }

        if summary.directives == 0 {
            print_warning("No annotations found in the configured paths");
        }
        let style = OutputStyle::default();
        println!("{}", style.success("Threat model updated"));
        println!("{}", style.section("Summary"));
        for (key, value) in [
            ("annotated blocks", summary.blocks),
            ("directives", summary.directives),
            ("components", summary.components),
            ("controls", summary.controls),
            ("threats", summary.threats),
            ("relations", summary.relations),
        ] {
            println!("{}", style.key_value(key, &value.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use threatline_config::ConfigError;
    use threatline_core::{GraphError, Namespace, TextBlock};

    fn project(dir: &Path, imports: &[&str]) {
        let mut config = ProjectConfig::default();
        config.imports = imports.iter().map(|i| i.to_string()).collect();
        ConfigManager::with_path(dir.join(DEFAULT_CONFIG_FILE))
            .save(&config)
            .unwrap();
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(
            dir.join("src/api.rs"),
            "// @component API\n\
             // @mitigates API against SQLi with Prepared-Statements\n\
             fn query() {}\n",
        )
        .unwrap();
    }

    #[test]
    fn test_run_builds_and_saves_graph() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path(), &[]);

        let (graph, summary) = RunCommand::new(dir.path()).run().unwrap();

        assert_eq!(summary.blocks, 1);
        assert_eq!(summary.directives, 2);
        assert_eq!(summary.components, 1);
        assert_eq!(summary.relations, 1);
        let mitigation = &graph.relations().mitigations()[0];
        assert_eq!(mitigation.source.filename, "src/api.rs");
        assert_eq!(mitigation.source.line, 2);
        assert_eq!(mitigation.source.code, "fn query() {}");
        assert!(GraphStore::new(dir.path().join("threatmodel")).exists());
    }

    #[test]
    fn test_rerun_rebuilds_from_sources() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path(), &[]);

        let (_, first) = RunCommand::new(dir.path()).run().unwrap();
        for _ in 0..3 {
            let (_, again) = RunCommand::new(dir.path()).run().unwrap();
            assert_eq!(again, first);
        }

        fs::write(dir.path().join("src/api.rs"), "fn query() {}\n").unwrap();
        let (graph, summary) = RunCommand::new(dir.path()).run().unwrap();
        assert_eq!(summary.relations, 0);
        assert!(graph.registry().is_empty());

        let stored = GraphStore::new(dir.path().join("threatmodel")).load().unwrap();
        assert!(stored.relations().mitigations().is_empty());
        assert!(stored.registry().component("API").is_none());
    }

    #[test]
    fn test_merge_run_builds_on_prior_graph() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path(), &[]);

        let (first, _) = RunCommand::new(dir.path()).run().unwrap();
        let (second, _) = RunCommand::new(dir.path()).with_merge(true).run().unwrap();

        assert_ne!(first.run_id(), second.run_id());
        assert_eq!(second.registry().len(), first.registry().len());
        assert_eq!(second.relations().len(), first.relations().len() * 2);
        // entities keep the run that created them
        let api = second.registry().component("API").unwrap();
        assert_eq!(api.run_id, first.run_id());
    }

    #[test]
    fn test_partial_store_aborts() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path(), &[]);
        fs::create_dir_all(dir.path().join("threatmodel")).unwrap();
        fs::write(dir.path().join("threatmodel/threats.json"), "{}").unwrap();

        let result = RunCommand::new(dir.path()).with_merge(true).run();
        assert!(matches!(
            result,
            Err(CliError::Graph(GraphError::MissingData { .. }))
        ));
    }

    #[test]
    fn test_corrupt_store_aborts() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path(), &[]);
        RunCommand::new(dir.path()).run().unwrap();
        fs::write(dir.path().join("threatmodel/components.json"), "[1, 2]").unwrap();

        let result = RunCommand::new(dir.path()).with_merge(true).run();
        assert!(matches!(
            result,
            Err(CliError::Graph(GraphError::CorruptData { .. }))
        ));
    }

    #[test]
    fn test_imported_library_entities_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path(), &["shared"]);

        let mut library = ThreatGraph::with_run_id("library");
        library.parse(&TextBlock::new(
            "@control Prepared-Statements -- parameterised SQL only",
        ));
        GraphStore::new(dir.path().join("shared/threatmodel"))
            .save(&library)
            .unwrap();

        let (graph, _) = RunCommand::new(dir.path()).run().unwrap();
        let control = graph.registry().control("Prepared-Statements").unwrap();
        assert_eq!(control.description, "parameterised SQL only");
        assert_eq!(control.run_id, "library");
        assert!(graph.registry().contains(Namespace::Threat, "SQLi"));
    }

    #[test]
    fn test_missing_import_aborts() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path(), &["nowhere"]);

        let result = RunCommand::new(dir.path()).run();
        assert!(matches!(
            result,
            Err(CliError::Import { ref import, ref source }) if import == "nowhere" && source.is_missing()
        ));
    }

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let result = RunCommand::new(dir.path()).run();
        assert!(matches!(
            result,
            Err(CliError::Config(ConfigError::NotFound(_)))
        ));
    }
}
