//! Property tests for the parse → save → load cycle
//!
//! Graphs are built from generated directive text, so every case exercises the grammar,
//! the registry and the collector before hitting the store.

use proptest::prelude::*;
use tempfile::tempdir;
use threatline_core::store::GRAPH_DOCUMENTS;
use threatline_core::{GraphStore, Namespace, TextBlock, ThreatGraph};

fn arb_name() -> impl Strategy<Value = String> {
    r"[A-Z][a-z]{1,6}(:[A-Z][a-z]{1,6}){0,2}"
}

fn arb_details() -> impl Strategy<Value = String> {
    r"[a-z]{2,6}( [a-z]{2,6}){0,3}"
}

fn arb_directive() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_name().prop_map(|n| format!("@component {}", n)),
        (arb_name(), arb_details()).prop_map(|(n, d)| format!("@control {} -- {}", n, d)),
        arb_name().prop_map(|n| format!("@threat {}", n)),
        (arb_name(), arb_name(), arb_name())
            .prop_map(|(c, t, k)| format!("@mitigates {} against {} with {}", c, t, k)),
        (arb_name(), arb_name(), arb_details())
            .prop_map(|(t, c, d)| format!("@accepts {} to {} with {}", t, c, d)),
        (arb_name(), arb_name(), arb_name(), arb_details())
            .prop_map(|(t, s, d, x)| format!("@transfers {} from {} to {} with {}", t, s, d, x)),
        (arb_name(), arb_name(), arb_details())
            .prop_map(|(c, t, d)| format!("@exposes {} to {} with {}", c, t, d)),
        (arb_name(), prop::bool::ANY, arb_name(), arb_details()).prop_map(|(s, to, d, x)| {
            format!("@connects {} {} {} with {}", s, if to { "to" } else { "with" }, d, x)
        }),
        (arb_name(), arb_details()).prop_map(|(c, d)| format!("@review {} {}", c, d)),
        (arb_name(), arb_name()).prop_map(|(k, c)| format!("@tests {} for {}", k, c)),
        arb_details(),
    ]
}

fn arb_blocks() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(arb_directive(), 0..6), 0..6)
}

fn build_graph(blocks: &[Vec<String>]) -> ThreatGraph {
    let mut graph = ThreatGraph::with_run_id("prop-run");
    for (i, lines) in blocks.iter().enumerate() {
        let text = lines
            .iter()
            .map(|line| format!("// {}", line))
            .collect::<Vec<_>>()
            .join("\n");
        graph.parse(&TextBlock::located(text, "src/lib.rs", i * 10 + 1, ""));
    }
    graph
}

proptest! {
    /// Save then load reproduces the same registry and relation sequences
    #[test]
    fn prop_save_load_roundtrip(blocks in arb_blocks()) {
        let graph = build_graph(&blocks);
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path());

        store.save(&graph).expect("Failed to save graph");
        let loaded = store.load().expect("Failed to load graph");

        prop_assert_eq!(loaded.registry(), graph.registry());
        prop_assert_eq!(loaded.relations(), graph.relations());
        prop_assert_eq!(loaded.run_id(), graph.run_id());
    }

    /// Save(Load(Save(G))) writes byte-identical documents to Save(G)
    #[test]
    fn prop_resave_is_stable(blocks in arb_blocks()) {
        let graph = build_graph(&blocks);
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        let first_store = GraphStore::new(first.path());
        let second_store = GraphStore::new(second.path());

        first_store.save(&graph).unwrap();
        let reloaded = first_store.load().unwrap();
        second_store.save(&reloaded).unwrap();

        for document in GRAPH_DOCUMENTS {
            let a = std::fs::read_to_string(first_store.document_path(document)).unwrap();
            let b = std::fs::read_to_string(second_store.document_path(document)).unwrap();
            prop_assert_eq!(a, b, "{} differs after reload", document);
        }
    }

    /// Every name a relation uses is registered in the matching namespace
    #[test]
    fn prop_relation_names_are_registered(blocks in arb_blocks()) {
        let graph = build_graph(&blocks);
        let registry = graph.registry();
        let relations = graph.relations();

        for m in relations.mitigations() {
            prop_assert!(registry.contains(Namespace::Component, &m.component));
            prop_assert!(registry.contains(Namespace::Threat, &m.threat));
            prop_assert!(registry.contains(Namespace::Control, &m.control));
        }
        for t in relations.transfers() {
            prop_assert!(registry.contains(Namespace::Threat, &t.threat));
            prop_assert!(registry.contains(Namespace::Component, &t.source_component));
            prop_assert!(registry.contains(Namespace::Component, &t.destination_component));
        }
        for c in relations.connections() {
            prop_assert!(registry.contains(Namespace::Component, &c.source_component));
            prop_assert!(registry.contains(Namespace::Component, &c.destination_component));
        }
        for t in relations.tests() {
            prop_assert!(registry.contains(Namespace::Control, &t.control));
            prop_assert!(registry.contains(Namespace::Component, &t.component));
        }
        for r in relations.reviews() {
            prop_assert!(registry.contains(Namespace::Component, &r.component));
        }
    }

    /// Parsing the same blocks twice doubles relations but not entities
    #[test]
    fn prop_repetition_doubles_relations_only(blocks in arb_blocks()) {
        let once = build_graph(&blocks);
        let doubled: Vec<Vec<String>> = blocks.iter().chain(blocks.iter()).cloned().collect();
        let twice = build_graph(&doubled);

        prop_assert_eq!(twice.relations().len(), once.relations().len() * 2);
        prop_assert_eq!(twice.registry().len(), once.registry().len());
    }
}
