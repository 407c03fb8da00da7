//! Level 5: Keyboard Tests
//!
//! Delete/Backspace removal with pass-through bridging, Escape
//! cancellation, select-all and the space-bar pan override.

mod common;

use common::harness::EditorHarness;
use slint_graph_canvas::{DragState, Key, Modifiers, Node, UiRequest};

fn ctrl() -> Modifiers {
    Modifiers {
        ctrl: true,
        ..Default::default()
    }
}

#[test]
fn test_delete_removes_selected_nodes_and_their_links() {
    let mut harness = EditorHarness::new();
    let a = harness.add("source/const", (0.0, 0.0));
    let b = harness.add("sink/preview", (300.0, 0.0));
    harness.graph.connect(a, 0, b, 0).unwrap();

    harness.key_mod(Key::A, ctrl());
    harness.key(Key::Delete);

    assert_eq!(harness.graph.node_count(), 0);
    assert_eq!(harness.graph.link_count(), 0);
    assert!(harness.selected_ids().is_empty());
}

#[test]
fn test_backspace_acts_like_delete() {
    let mut harness = EditorHarness::new();
    let a = harness.add("source/const", (0.0, 0.0));

    harness.click((70.0, 13.0));
    assert_eq!(harness.selected_ids(), vec![a]);
    harness.key(Key::Backspace);

    assert_eq!(harness.graph.node_count(), 0);
}

#[test]
fn test_delete_bridges_pass_through_node() {
    let mut harness = EditorHarness::new();
    let a = harness.add("source/const", (0.0, 0.0));
    let m = harness.add("filter/relay", (300.0, 0.0));
    let b = harness.add("sink/preview", (600.0, 0.0));
    harness.graph.connect(a, 0, m, 0).unwrap();
    harness.graph.connect(m, 0, b, 0).unwrap();

    harness.click((370.0, 13.0));
    assert_eq!(harness.selected_ids(), vec![m]);
    harness.key(Key::Delete);

    // the chain survives: A's output now feeds B directly
    assert!(harness.graph.node(m).is_none());
    assert_eq!(harness.graph.link_count(), 1);
    let link = harness.graph.links().next().unwrap();
    assert_eq!(link.origin_id, a);
    assert_eq!(link.target_id, b);
    assert_eq!(
        harness.graph.node(b).unwrap().inputs[0].link,
        Some(link.id)
    );
}

#[test]
fn test_delete_does_not_bridge_mismatched_types() {
    let mut harness = EditorHarness::new();
    let a = harness.add("source/const", (0.0, 0.0));
    let b = harness.add("image/blur", (600.0, 0.0));

    let mut raster = Node::new("convert/rasterize", "Rasterize");
    raster.add_input("in", "number");
    raster.add_output("out", "image");
    raster.pos = (300.0, 0.0);
    let m = harness.graph.add_node(raster).unwrap();

    harness.graph.connect(a, 0, m, 0).unwrap();
    harness.graph.connect(m, 0, b, 0).unwrap();

    harness.click((370.0, 13.0));
    harness.key(Key::Delete);

    // number cannot bridge into an image input
    assert!(harness.graph.node(m).is_none());
    assert_eq!(harness.graph.link_count(), 0);
    assert_eq!(harness.graph.node(b).unwrap().inputs[0].link, None);
}

#[test]
fn test_delete_spares_pinned_nodes() {
    let mut harness = EditorHarness::new();
    let a = harness.add("source/const", (0.0, 0.0));
    let b = harness.add("sink/preview", (300.0, 0.0));
    harness.graph.node_mut(a).unwrap().pinned = true;

    harness.key_mod(Key::A, ctrl());
    harness.key(Key::Delete);

    assert!(harness.graph.node(a).is_some());
    assert!(harness.graph.node(b).is_none());
}

#[test]
fn test_read_only_blocks_delete() {
    let mut harness = EditorHarness::new();
    let a = harness.add("source/const", (0.0, 0.0));
    harness.click((70.0, 13.0));

    harness.controller.read_only = true;
    harness.key(Key::Delete);

    assert!(harness.graph.node(a).is_some());
}

#[test]
fn test_escape_cancels_connect_and_closes_panels() {
    let mut harness = EditorHarness::new();
    let a = harness.add("source/const", (0.0, 0.0));

    harness.advance(500.0);
    harness.pointer_down(harness.output_anchor(a, 0));
    harness.pointer_move((300.0, 150.0));
    assert!(matches!(
        harness.controller.drag_state(),
        DragState::Connecting { .. }
    ));
    assert!(harness.controller.overlay.pending_link.is_some());

    harness.key(Key::Escape);

    assert!(harness.controller.is_idle());
    assert!(harness.controller.overlay.pending_link.is_none());
    assert!(harness.requests().contains(&UiRequest::ClosePanels));
    assert_eq!(harness.graph.link_count(), 0);
}

#[test]
fn test_escape_clears_selection_rectangle() {
    let mut harness = EditorHarness::new();
    harness.add("source/const", (200.0, 200.0));

    harness.advance(500.0);
    harness.pointer_down_mod((0.0, 0.0), ctrl());
    harness.pointer_move((120.0, 120.0));
    assert!(harness.controller.overlay.selection_rect.is_some());

    harness.key(Key::Escape);

    assert!(harness.controller.is_idle());
    assert!(harness.controller.overlay.selection_rect.is_none());
    assert!(harness.selected_ids().is_empty());
}

#[test]
fn test_space_release_restores_node_dragging() {
    let mut harness = EditorHarness::new();
    let a = harness.add("source/const", (0.0, 0.0));

    harness.key(Key::Space);
    harness.controller.key_up(Key::Space);
    harness.drag((70.0, 13.0), (170.0, 63.0));

    assert_eq!(harness.node_pos(a), (100.0, 50.0));
}

#[test]
fn test_plain_a_does_not_select_all() {
    let mut harness = EditorHarness::new();
    harness.add("source/const", (0.0, 0.0));
    harness.add("source/const", (300.0, 0.0));

    harness.key(Key::A);

    assert!(harness.selected_ids().is_empty());
}
