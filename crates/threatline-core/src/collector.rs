//! Relation collector
//!
//! One append-only sequence per relation kind. Appending resolves every referenced entity
//! first, so after [`RelationCollector::append`] returns every name used by the relation is
//! present in the registry.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{
    Acceptance, Connection, Exposure, Mitigation, Relation, Review, Test, Transfer,
};
use crate::registry::EntityRegistry;

/// Insertion-ordered relation sequences
///
/// Field names match the keys of `threatModel.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationCollector {
    mitigations: Vec<Mitigation>,
    exposures: Vec<Exposure>,
    transfers: Vec<Transfer>,
    acceptances: Vec<Acceptance>,
    connections: Vec<Connection>,
    reviews: Vec<Review>,
    tests: Vec<Test>,
}

impl RelationCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the entities `relation` references, then append it to its sequence
    ///
    /// Identical relations are appended every time they are seen.
    pub fn append(&mut self, registry: &mut EntityRegistry, relation: Relation) {
        for (namespace, name) in relation.entity_refs() {
            registry.get_or_create(namespace, name);
        }
        debug!(kind = relation.kind(), "Appending relation");

        match relation {
            Relation::Mitigation(m) => self.mitigations.push(m),
            Relation::Acceptance(a) => self.acceptances.push(a),
            Relation::Exposure(e) => self.exposures.push(e),
            Relation::Transfer(t) => self.transfers.push(t),
            Relation::Connection(c) => self.connections.push(c),
            Relation::Review(r) => self.reviews.push(r),
            Relation::Test(t) => self.tests.push(t),
        }
    }

    pub fn mitigations(&self) -> &[Mitigation] {
        &self.mitigations
    }

    pub fn exposures(&self) -> &[Exposure] {
        &self.exposures
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn acceptances(&self) -> &[Acceptance] {
        &self.acceptances
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    /// Total number of relation records across kinds
    pub fn len(&self) -> usize {
        self.mitigations.len()
            + self.exposures.len()
            + self.transfers.len()
            + self.acceptances.len()
            + self.connections.len()
            + self.reviews.len()
            + self.tests.len()
    }

    /// Whether no relation has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Namespace;

    fn mitigation(component: &str, threat: &str, control: &str) -> Relation {
        Relation::Mitigation(Mitigation {
            component: component.to_string(),
            threat: threat.to_string(),
            control: control.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_append_resolves_every_name() {
        let mut registry = EntityRegistry::default();
        let mut collector = RelationCollector::new();

        collector.append(&mut registry, mitigation("API", "SQLi", "Prepared-Statements"));

        assert!(registry.contains(Namespace::Component, "API"));
        assert!(registry.contains(Namespace::Threat, "SQLi"));
        assert!(registry.contains(Namespace::Control, "Prepared-Statements"));
        assert_eq!(collector.mitigations().len(), 1);
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let mut registry = EntityRegistry::default();
        let mut collector = RelationCollector::new();

        collector.append(&mut registry, mitigation("A", "T1", "C"));
        collector.append(&mut registry, mitigation("B", "T2", "C"));
        collector.append(&mut registry, mitigation("A", "T1", "C"));

        let components: Vec<&str> = collector
            .mitigations()
            .iter()
            .map(|m| m.component.as_str())
            .collect();
        assert_eq!(components, vec!["A", "B", "A"]);
        assert_eq!(registry.components().len(), 2);
        assert_eq!(registry.controls().len(), 1);
    }

    #[test]
    fn test_kinds_go_to_their_own_sequence() {
        let mut registry = EntityRegistry::default();
        let mut collector = RelationCollector::new();

        collector.append(
            &mut registry,
            Relation::Review(Review {
                component: "Upload".to_string(),
                details: "check limits".to_string(),
                ..Default::default()
            }),
        );
        collector.append(
            &mut registry,
            Relation::Connection(Connection {
                source_component: "Browser".to_string(),
                destination_component: "Upload".to_string(),
                ..Default::default()
            }),
        );

        assert_eq!(collector.reviews().len(), 1);
        assert_eq!(collector.connections().len(), 1);
        assert!(collector.mitigations().is_empty());
        assert_eq!(registry.components().len(), 2);
    }
}
