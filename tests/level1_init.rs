//! Level 1: Construction Tests
//!
//! Graph/editor bring-up: registry resolution, node identity, version
//! counting, capacity limits, and the first rendered frame.

mod common;

use common::harness::EditorHarness;
use slint_graph_canvas::{Graph, GraphError, IdMode, Node};

#[test]
fn test_harness_starts_empty() {
    let harness = EditorHarness::new();
    assert_eq!(harness.graph.node_count(), 0);
    assert_eq!(harness.graph.link_count(), 0);
    assert!(harness.controller.is_idle());
}

#[test]
fn test_registry_creates_registered_types() {
    let harness = EditorHarness::new();
    let node = harness.registry.create("math/sum").unwrap();
    assert_eq!(node.inputs.len(), 2);
    assert_eq!(node.outputs.len(), 1);
    assert!(harness.registry.create("not/registered").is_none());
}

#[test]
fn test_added_nodes_get_sequential_ids() {
    let mut harness = EditorHarness::new();
    let a = harness.add("source/const", (0.0, 0.0));
    let b = harness.add("math/sum", (200.0, 0.0));
    assert_eq!(a, 1);
    assert_eq!(b, 2);
    assert_eq!(harness.graph.node_count(), 2);
}

#[test]
fn test_random_id_mode_produces_unique_ids() {
    let mut graph = Graph::new();
    graph.config.id_mode = IdMode::Random;
    let mut ids = std::collections::HashSet::new();
    for _ in 0..50 {
        let id = graph.add_node(Node::new("test/n", "N")).unwrap();
        assert!(ids.insert(id), "id {id} repeated");
    }
}

#[test]
fn test_version_increases_on_every_structural_change() {
    let mut harness = EditorHarness::new();
    let mut last = harness.graph.version();
    let a = harness.add("source/const", (0.0, 0.0));
    assert!(harness.graph.version() > last);
    last = harness.graph.version();

    let b = harness.add("sink/preview", (300.0, 0.0));
    assert!(harness.graph.version() > last);
    last = harness.graph.version();

    harness.graph.connect(a, 0, b, 0).unwrap();
    assert!(harness.graph.version() > last);
    last = harness.graph.version();

    harness.graph.disconnect_input(b, 0);
    assert!(harness.graph.version() > last);
    last = harness.graph.version();

    harness.graph.remove_node(a);
    assert!(harness.graph.version() > last);
}

#[test]
fn test_node_capacity_is_a_hard_error() {
    let mut harness = EditorHarness::new();
    harness.graph.config.max_nodes = 3;
    for i in 0..3 {
        harness.add("source/const", (i as f32 * 50.0, 0.0));
    }
    let extra = harness.registry.create("source/const").unwrap();
    match harness.graph.add_node(extra) {
        Err(GraphError::NodeLimit { max }) => assert_eq!(max, 3),
        other => panic!("expected NodeLimit, got {other:?}"),
    }
    assert_eq!(harness.graph.node_count(), 3);
}

#[test]
fn test_first_frame_renders_and_settles() {
    let mut harness = EditorHarness::new();
    harness.add("source/const", (100.0, 100.0));

    assert!(harness.draw());
    // nothing changed: the second frame must be free
    assert!(!harness.draw());

    harness.pipeline.mark_dirty(true, false);
    assert!(harness.draw());
}

#[test]
fn test_empty_graph_serializes_and_restores() {
    let harness = EditorHarness::new();
    let data = harness.graph.serialize();
    assert!(data.nodes.is_empty());
    assert!(data.links.is_empty());

    let mut restored = Graph::new();
    assert!(!restored.configure(&data, &harness.registry));
    assert_eq!(restored.node_count(), 0);
}

#[test]
fn test_node_lookup_by_position_and_title() {
    let mut harness = EditorHarness::new();
    let a = harness.add("source/const", (100.0, 100.0));
    assert_eq!(harness.graph.node_on_pos(120.0, 110.0, 0.0), Some(a));
    assert_eq!(harness.graph.node_on_pos(900.0, 900.0, 0.0), None);
    assert_eq!(harness.graph.find_node_by_title("Const"), Some(a));
    assert_eq!(harness.graph.find_nodes_by_type("SOURCE/CONST"), vec![a]);
}
