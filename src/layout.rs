//! Sugiyama hierarchical graph layout.
//!
//! Computes layered positions for a whole graph using the
//! `rust-sugiyama` crate — a richer alternative to
//! [`Graph::arrange`](crate::graph::Graph::arrange)'s simple
//! level-column pass. The layout API uses `f64` because the underlying
//! crate does; positions are converted back to `f32` when applied.
//!
//! Requires the `layout` feature.

use std::collections::{HashMap, HashSet};

use crate::graph::Graph;
use crate::node::{NodeId, NODE_TITLE_HEIGHT};

/// Layout direction.
///
/// Marked `#[non_exhaustive]` so additional directions can be added
/// without breaking callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum Direction {
    /// Layers flow top to bottom (default).
    #[default]
    TopToBottom,
    /// Layers flow left to right.
    LeftToRight,
}

/// A positioned node returned by [`sugiyama_layout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub id: NodeId,
    /// X coordinate of the node's top-left corner.
    pub x: f64,
    /// Y coordinate of the node's top-left corner.
    pub y: f64,
}

/// Configuration for the Sugiyama algorithm.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct SugiyamaConfig {
    /// Minimum spacing between vertices (0.0 uses the crate default).
    pub vertex_spacing: f64,
    /// Minimum edge length between layers (0 uses the crate default).
    pub minimum_length: u32,
    /// Whether to include dummy vertices in the layout.
    pub dummy_vertices: bool,
    pub direction: Direction,
}

/// Compute layered positions for every node in the graph.
///
/// Edges follow the link table with duplicates between the same node
/// pair collapsed; disconnected islands come back as separate subgraph
/// layouts merged into one result.
pub fn sugiyama_layout(graph: &Graph, config: &SugiyamaConfig) -> Vec<NodePosition> {
    if graph.node_count() == 0 {
        return Vec::new();
    }
    let horizontal = config.direction == Direction::LeftToRight;

    let mut id_to_idx: HashMap<NodeId, u32> = HashMap::new();
    let mut idx_to_id: Vec<NodeId> = Vec::with_capacity(graph.node_count());
    for node in graph.nodes() {
        id_to_idx.entry(node.id).or_insert_with(|| {
            idx_to_id.push(node.id);
            (idx_to_id.len() - 1) as u32
        });
    }

    // node extents include the title bar; horizontal layouts swap the
    // axes so layers spread along x
    let vertices: Vec<(u32, (f64, f64))> = graph
        .nodes()
        .map(|node| {
            let idx = id_to_idx[&node.id];
            let w = node.size.0 as f64;
            let h = (node.size.1 + NODE_TITLE_HEIGHT) as f64;
            (idx, if horizontal { (h, w) } else { (w, h) })
        })
        .collect();

    let mut seen_pairs: HashSet<(u32, u32)> = HashSet::new();
    let edges: Vec<(u32, u32)> = graph
        .links()
        .filter_map(|link| {
            let src = *id_to_idx.get(&link.origin_id)?;
            let dst = *id_to_idx.get(&link.target_id)?;
            seen_pairs.insert((src, dst)).then_some((src, dst))
        })
        .collect();

    let mut sg_config = rust_sugiyama::configure::Config {
        dummy_vertices: config.dummy_vertices,
        ..Default::default()
    };
    if config.vertex_spacing > 0.0 {
        sg_config.vertex_spacing = config.vertex_spacing;
    }
    if config.minimum_length > 0 {
        sg_config.minimum_length = config.minimum_length;
    }

    let subgraphs = rust_sugiyama::from_vertices_and_edges(&vertices, &edges, &sg_config);

    let mut results = Vec::with_capacity(idx_to_id.len());
    for (layout, _width, _height) in &subgraphs {
        for &(idx, (x, y)) in layout {
            if let Some(&node_id) = idx_to_id.get(idx) {
                let (px, py) = if horizontal { (y, x) } else { (x, y) };
                results.push(NodePosition {
                    id: node_id,
                    x: px,
                    y: py,
                });
            }
        }
    }
    results
}

/// Write layout positions back into the graph.
pub fn apply_layout(graph: &mut Graph, positions: &[NodePosition]) {
    for position in positions {
        if let Some(node) = graph.node_mut(position.id) {
            node.pos = (position.x as f32, position.y as f32 + NODE_TITLE_HEIGHT);
        }
    }
}
