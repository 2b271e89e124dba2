//! Threat graph: registry + relations for one run
//!
//! [`ThreatGraph`] is the only mutable owner of the registry and collector. Scanning a
//! block ([`scan_block`]) is pure and may run on any thread; merging the result
//! ([`ThreatGraph::merge`]) must happen on the single thread that owns the graph.

use tracing::debug;
use uuid::Uuid;

use crate::collector::RelationCollector;
use crate::grammar::{Annotation, AnnotationGrammar, Directive};
use crate::models::TextBlock;
use crate::registry::EntityRegistry;

/// A text block together with the directives found in it
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedBlock {
    pub block: TextBlock,
    pub annotations: Vec<Annotation>,
}

/// Run the grammar over `block` without touching any graph
pub fn scan_block(block: TextBlock) -> AnnotatedBlock {
    let annotations = AnnotationGrammar::new().parse(&block.text);
    AnnotatedBlock { block, annotations }
}

/// Entities and relations produced by a parsing run
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatGraph {
    run_id: String,
    registry: EntityRegistry,
    relations: RelationCollector,
}

impl Default for ThreatGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreatGraph {
    /// Empty graph with a fresh run identifier
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4().to_string())
    }

    /// Empty graph with the given run identifier
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        Self {
            registry: EntityRegistry::new(run_id.clone()),
            relations: RelationCollector::new(),
            run_id,
        }
    }

    /// Reassemble a graph from persisted parts
    pub fn from_parts(
        run_id: impl Into<String>,
        mut registry: EntityRegistry,
        relations: RelationCollector,
    ) -> Self {
        let run_id = run_id.into();
        registry.set_run_id(run_id.clone());
        Self {
            run_id,
            registry,
            relations,
        }
    }

    /// Begin a new run on top of the current (typically reloaded) contents
    pub fn start_run(&mut self) -> &str {
        self.run_id = Uuid::new_v4().to_string();
        self.registry.set_run_id(self.run_id.clone());
        debug!(run_id = %self.run_id, "Starting run");
        &self.run_id
    }

    /// Parse one block and merge its directives. Returns how many were applied.
    pub fn parse(&mut self, block: &TextBlock) -> usize {
        let annotations = AnnotationGrammar::new().parse(&block.text);
        self.apply(block, annotations)
    }

    /// Merge a block scanned elsewhere
    pub fn merge(&mut self, scanned: AnnotatedBlock) -> usize {
        self.apply(&scanned.block, scanned.annotations)
    }

    /// Merge entities from a shared library; local entities win
    pub fn import_library(&mut self, library: EntityRegistry) {
        self.registry.absorb(library);
    }

    fn apply(&mut self, block: &TextBlock, annotations: Vec<Annotation>) -> usize {
        let count = annotations.len();
        for annotation in annotations {
            match annotation.directive {
                Directive::Declaration {
                    namespace,
                    name,
                    description,
                } => {
                    self.registry
                        .declare(namespace, &name, description.as_deref());
                }
                Directive::Relation(mut relation) => {
                    let source = relation.source_mut();
                    source.annotation = annotation.text;
                    if let Some(location) = &block.location {
                        source.filename = location.filename.clone();
                        source.code = location.code.clone();
                        source.line = location.line + annotation.line;
                    }
                    self.relations.append(&mut self.registry, relation);
                }
            }
        }
        count
    }

    /// Identifier of the current run
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Read access to the entity registry
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Read access to the relation sequences
    pub fn relations(&self) -> &RelationCollector {
        &self.relations
    }
}
