//! Graph persistence
//!
//! A graph is stored as four JSON documents in one directory: one map per entity namespace
//! and `threatModel.json` with every relation sequence plus the run id. Loading is
//! all-or-nothing; the documents are written one after another, so a crash mid-save can
//! leave them out of step with each other.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collector::RelationCollector;
use crate::error::{GraphError, GraphResult};
use crate::graph::ThreatGraph;
use crate::models::{Component, Control, Threat};
use crate::registry::EntityRegistry;

/// Default store directory, relative to the project root
pub const DEFAULT_STORE_DIR: &str = "threatmodel";
/// Control map document
pub const CONTROLS_DOCUMENT: &str = "controls.json";
/// Threat map document
pub const THREATS_DOCUMENT: &str = "threats.json";
/// Component map document
pub const COMPONENTS_DOCUMENT: &str = "components.json";
/// Relation sequences document
pub const THREAT_MODEL_DOCUMENT: &str = "threatModel.json";

/// Every document that makes up a stored graph
pub const GRAPH_DOCUMENTS: [&str; 4] = [
    CONTROLS_DOCUMENT,
    THREATS_DOCUMENT,
    COMPONENTS_DOCUMENT,
    THREAT_MODEL_DOCUMENT,
];

#[derive(Serialize)]
struct ThreatModelOut<'a> {
    #[serde(flatten)]
    relations: &'a RelationCollector,
    run_id: &'a str,
}

#[derive(Deserialize)]
struct ThreatModelIn {
    #[serde(flatten)]
    relations: RelationCollector,
    run_id: String,
}

/// Reads and writes the graph documents in one directory
#[derive(Debug, Clone)]
pub struct GraphStore {
    dir: PathBuf,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_DIR)
    }
}

impl GraphStore {
    /// Store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of one document inside the store
    pub fn document_path(&self, document: &str) -> PathBuf {
        self.dir.join(document)
    }

    /// Whether all four documents are present
    pub fn exists(&self) -> bool {
        GRAPH_DOCUMENTS
            .iter()
            .all(|document| self.document_path(document).is_file())
    }

    /// Write the whole graph, replacing any previous documents
    pub fn save(&self, graph: &ThreatGraph) -> GraphResult<()> {
        fs::create_dir_all(&self.dir)?;

        let registry = graph.registry();
        self.write_document(CONTROLS_DOCUMENT, registry.controls())?;
        self.write_document(THREATS_DOCUMENT, registry.threats())?;
        self.write_document(COMPONENTS_DOCUMENT, registry.components())?;
        self.write_document(
            THREAT_MODEL_DOCUMENT,
            &ThreatModelOut {
                relations: graph.relations(),
                run_id: graph.run_id(),
            },
        )?;

        info!(
            dir = %self.dir.display(),
            entities = registry.len(),
            relations = graph.relations().len(),
            "Saved threat graph"
        );
        Ok(())
    }

    /// Read a previously saved graph
    ///
    /// Fails with [`GraphError::MissingData`] if any document is absent and with
    /// [`GraphError::CorruptData`] if one does not decode.
    pub fn load(&self) -> GraphResult<ThreatGraph> {
        self.ensure_present(&GRAPH_DOCUMENTS)?;

        let registry = self.read_registry()?;
        let model: ThreatModelIn = self.read_document(THREAT_MODEL_DOCUMENT)?;

        info!(
            dir = %self.dir.display(),
            entities = registry.len(),
            relations = model.relations.len(),
            "Loaded threat graph"
        );
        Ok(ThreatGraph::from_parts(
            model.run_id,
            registry,
            model.relations,
        ))
    }

    /// Replace `graph` with the stored graph; `graph` is untouched on error
    pub fn load_into(&self, graph: &mut ThreatGraph) -> GraphResult<()> {
        *graph = self.load()?;
        Ok(())
    }

    /// Read only the three entity documents, e.g. from a shared threat library
    pub fn load_library(&self) -> GraphResult<EntityRegistry> {
        self.ensure_present(&[CONTROLS_DOCUMENT, THREATS_DOCUMENT, COMPONENTS_DOCUMENT])?;
        let registry = self.read_registry()?;
        debug!(dir = %self.dir.display(), entities = registry.len(), "Loaded entity library");
        Ok(registry)
    }

    fn ensure_present(&self, documents: &[&'static str]) -> GraphResult<()> {
        for &document in documents {
            let path = self.document_path(document);
            if !path.is_file() {
                return Err(GraphError::missing(document, path));
            }
        }
        Ok(())
    }

    fn read_registry(&self) -> GraphResult<EntityRegistry> {
        let controls: BTreeMap<String, Control> = self.read_document(CONTROLS_DOCUMENT)?;
        let threats: BTreeMap<String, Threat> = self.read_document(THREATS_DOCUMENT)?;
        let components: BTreeMap<String, Component> = self.read_document(COMPONENTS_DOCUMENT)?;
        Ok(EntityRegistry::from_parts(components, controls, threats))
    }

    fn read_document<T: DeserializeOwned>(&self, document: &'static str) -> GraphResult<T> {
        let path = self.document_path(document);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GraphError::missing(document, path));
            }
            Err(e) => return Err(GraphError::Io(e)),
        };
        serde_json::from_str(&content).map_err(|e| GraphError::corrupt(document, e))
    }

    fn write_document<T: Serialize + ?Sized>(&self, document: &str, value: &T) -> GraphResult<()> {
        let path = self.document_path(document);
        let content = serde_json::to_string_pretty(value).map_err(GraphError::Serialize)?;

        // Write to a sibling temp file and rename over the target
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &path)?;

        debug!(path = %path.display(), "Wrote graph document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextBlock;
    use tempfile::tempdir;

    fn sample_graph() -> ThreatGraph {
        let mut graph = ThreatGraph::with_run_id("run-1");
        graph.parse(&TextBlock::located(
            "@component Web:Frontend -- The SPA\n@mitigates Web:Frontend against XSS with CSP\n@connects Web:Frontend to Api with REST",
            "web/app.ts",
            3,
            "export function app() {",
        ));
        graph
    }

    #[test]
    fn test_save_writes_four_documents() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("threatmodel"));

        store.save(&sample_graph()).expect("Failed to save");

        for document in GRAPH_DOCUMENTS {
            assert!(store.document_path(document).is_file(), "{} missing", document);
        }
        assert!(store.exists());
        assert!(!store.document_path("threatModel.json.tmp").exists());
    }

    #[test]
    fn test_threat_model_document_shape() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        store.save(&sample_graph()).unwrap();

        let raw = fs::read_to_string(store.document_path(THREAT_MODEL_DOCUMENT)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        for key in [
            "mitigations",
            "exposures",
            "transfers",
            "acceptances",
            "connections",
            "reviews",
            "tests",
        ] {
            assert!(json[key].is_array(), "{} should be an array", key);
        }
        assert_eq!(json["run_id"], "run-1");
        assert_eq!(json["connections"][0]["direction"], "to");

        let raw = fs::read_to_string(store.document_path(COMPONENTS_DOCUMENT)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["Web:Frontend"]["paths"], serde_json::json!([["Web"]]));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        let graph = sample_graph();

        store.save(&graph).unwrap();
        let loaded = store.load().expect("Failed to load");

        assert_eq!(loaded, graph);
    }

    #[test]
    fn test_missing_document_leaves_graph_untouched() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        store.save(&sample_graph()).unwrap();
        fs::remove_file(store.document_path(THREATS_DOCUMENT)).unwrap();

        let mut target = ThreatGraph::with_run_id("untouched");
        target.parse(&TextBlock::new("@component Existing"));
        let before = target.clone();

        let err = store.load_into(&mut target).unwrap_err();
        assert!(matches!(
            err,
            GraphError::MissingData { document: THREATS_DOCUMENT, .. }
        ));
        assert_eq!(target, before);
    }

    #[test]
    fn test_corrupt_document() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        store.save(&sample_graph()).unwrap();
        fs::write(store.document_path(CONTROLS_DOCUMENT), "[1, 2, 3]").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(
            err,
            GraphError::CorruptData { document: CONTROLS_DOCUMENT, .. }
        ));
    }

    #[test]
    fn test_threat_model_missing_sequence_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        store.save(&sample_graph()).unwrap();
        fs::write(
            store.document_path(THREAT_MODEL_DOCUMENT),
            r#"{"mitigations": [], "run_id": "x"}"#,
        )
        .unwrap();

        assert!(matches!(
            store.load().unwrap_err(),
            GraphError::CorruptData { document: THREAT_MODEL_DOCUMENT, .. }
        ));
    }

    #[test]
    fn test_load_library_ignores_threat_model() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        store.save(&sample_graph()).unwrap();
        fs::remove_file(store.document_path(THREAT_MODEL_DOCUMENT)).unwrap();

        let library = store.load_library().expect("Failed to load library");
        assert!(library.threat("XSS").is_some());
        assert!(library.control("CSP").is_some());
        assert!(!store.exists());
    }

    #[test]
    fn test_load_from_empty_directory() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("nothing-here"));
        assert!(store.load().unwrap_err().is_missing());
    }
}
