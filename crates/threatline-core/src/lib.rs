//! Threatline core engine
//!
//! Extracts threat-modeling directives from comment text and assembles them into a graph of
//! components, controls and threats plus the relations between them.
//!
//! - [`grammar`]: tolerant `@directive` recognizer
//! - [`registry`]: name → entity resolution, first write wins
//! - [`collector`]: append-only relation sequences
//! - [`graph`]: one run's registry and relations
//! - [`store`]: four-document JSON persistence

pub mod collector;
pub mod error;
pub mod grammar;
pub mod graph;
pub mod models;
pub mod registry;
pub mod store;

pub use collector::RelationCollector;
pub use error::{GraphError, GraphResult};
pub use grammar::{Annotation, AnnotationGrammar, Directive, DirectiveRule, Family};
pub use graph::{scan_block, AnnotatedBlock, ThreatGraph};
pub use models::*;
pub use registry::{entity_key, Entity, EntityRef, EntityRegistry};
pub use store::{GraphStore, DEFAULT_STORE_DIR};
