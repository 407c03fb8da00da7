//! Copy/paste of a node subset.
//!
//! The payload is self-contained: nodes are stored serialized, links are
//! re-homed to *local indices* into the copied node list, so pasting
//! into any graph (or the same one, repeatedly) re-maps everything to
//! fresh ids. Where the payload ends up (OS clipboard, local storage)
//! is the host's business — this module only defines the value.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::registry::NodeRegistry;
use crate::selection::SelectionManager;
use crate::serialize::SerializedNode;

/// A copied subgraph. Serializable, so hosts can park it anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    pub nodes: Vec<SerializedNode>,
    /// `[origin_index, origin_slot, target_index, target_slot]` where the
    /// indices point into `nodes`.
    pub links: Vec<[usize; 4]>,
}

impl ClipboardPayload {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Copy the selected nodes and the links running *between* them.
/// Links to unselected nodes are dropped; slot link ids are cleared
/// because the payload's own link list is the only source of truth.
pub fn copy_selection(graph: &Graph, selection: &SelectionManager) -> ClipboardPayload {
    // z-order keeps the paste deterministic
    let ids: Vec<NodeId> = graph
        .z_order()
        .iter()
        .filter(|id| selection.contains(**id))
        .copied()
        .collect();
    let local_index = |id: NodeId| ids.iter().position(|&n| n == id);

    let nodes = ids
        .iter()
        .filter_map(|&id| graph.node(id))
        .map(|node| {
            let mut record = SerializedNode::from_node(node);
            for input in &mut record.inputs {
                input.link = None;
            }
            for output in &mut record.outputs {
                output.links.clear();
            }
            record
        })
        .collect();

    let mut links: Vec<(u64, [usize; 4])> = graph
        .links()
        .filter_map(|link| {
            let origin = local_index(link.origin_id)?;
            let target = local_index(link.target_id)?;
            Some((
                link.id,
                [origin, link.origin_slot, target, link.target_slot],
            ))
        })
        .collect();
    links.sort_by_key(|(id, _)| *id);

    ClipboardPayload {
        nodes,
        links: links.into_iter().map(|(_, record)| record).collect(),
    }
}

/// Paste a payload with its top-left corner at `pos` (graph space).
/// Every node gets a fresh id; internal links are re-created through
/// `connect`. Returns the new ids in payload order.
///
/// Fails only on the hard node-capacity limit; nodes added before the
/// failure are removed again so a failed paste leaves no half subgraph.
pub fn paste(
    graph: &mut Graph,
    registry: &NodeRegistry,
    payload: &ClipboardPayload,
    pos: (f32, f32),
) -> Result<Vec<NodeId>> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }

    let min_x = payload
        .nodes
        .iter()
        .map(|n| n.pos[0])
        .fold(f32::INFINITY, f32::min);
    let min_y = payload
        .nodes
        .iter()
        .map(|n| n.pos[1])
        .fold(f32::INFINITY, f32::min);

    let mut new_ids: Vec<NodeId> = Vec::with_capacity(payload.nodes.len());
    for record in &payload.nodes {
        let (mut node, _) = record.instantiate(registry);
        node.id = 0; // force a fresh id
        node.pos = (
            pos.0 + (record.pos[0] - min_x),
            pos.1 + (record.pos[1] - min_y),
        );
        match graph.add_node(node) {
            Ok(id) => new_ids.push(id),
            Err(err) => {
                for id in new_ids {
                    graph.remove_node(id);
                }
                return Err(err);
            }
        }
    }

    for &[origin, origin_slot, target, target_slot] in &payload.links {
        let (Some(&origin_id), Some(&target_id)) = (new_ids.get(origin), new_ids.get(target))
        else {
            log::warn!("clipboard link references node index out of range, skipping");
            continue;
        };
        graph.connect(origin_id, origin_slot, target_id, target_slot);
    }

    Ok(new_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeTemplate;

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(
            NodeTemplate::new("source/const", "Const").with_output("value", "number"),
        );
        registry.register(
            NodeTemplate::new("math/sum", "Sum")
                .with_input("a", "number")
                .with_input("b", "number")
                .with_output("out", "number"),
        );
        registry
    }

    fn chain(registry: &NodeRegistry) -> (Graph, NodeId, NodeId, NodeId) {
        let mut graph = Graph::new();
        let a = graph.add_node(registry.create("source/const").unwrap()).unwrap();
        let b = graph.add_node(registry.create("math/sum").unwrap()).unwrap();
        let c = graph.add_node(registry.create("math/sum").unwrap()).unwrap();
        graph.node_mut(a).unwrap().pos = (100.0, 100.0);
        graph.node_mut(b).unwrap().pos = (400.0, 120.0);
        graph.node_mut(c).unwrap().pos = (700.0, 140.0);
        graph.connect(a, 0, b, 0).unwrap();
        graph.connect(b, 0, c, 0).unwrap();
        (graph, a, b, c)
    }

    #[test]
    fn test_copy_includes_only_internal_links() {
        let registry = registry();
        let (mut graph, a, b, c) = chain(&registry);
        let mut selection = SelectionManager::new();
        selection.extend(&mut graph, vec![a, b], false);

        let payload = copy_selection(&graph, &selection);

        assert_eq!(payload.nodes.len(), 2);
        // only a -> b survives; b -> c leaves the selection
        assert_eq!(payload.links, vec![[0, 0, 1, 0]]);
        assert!(payload.nodes.iter().all(|n| n.inputs.iter().all(|s| s.link.is_none())));
        let _ = c;
    }

    #[test]
    fn test_paste_rehomes_ids_and_links() {
        let registry = registry();
        let (mut graph, a, b, _) = chain(&registry);
        let mut selection = SelectionManager::new();
        selection.extend(&mut graph, vec![a, b], false);
        let payload = copy_selection(&graph, &selection);

        let before_nodes = graph.node_count();
        let before_links = graph.link_count();
        let new_ids = paste(&mut graph, &registry, &payload, (1000.0, 1000.0)).unwrap();

        assert_eq!(new_ids.len(), 2);
        assert!(new_ids.iter().all(|id| ![a, b].contains(id)));
        assert_eq!(graph.node_count(), before_nodes + 2);
        assert_eq!(graph.link_count(), before_links + 1);

        // pasted link connects the new nodes, not the originals
        let pasted_target = graph.node(new_ids[1]).unwrap();
        let link_id = pasted_target.inputs[0].link.expect("pasted link");
        assert_eq!(graph.link(link_id).unwrap().origin_id, new_ids[0]);
    }

    #[test]
    fn test_paste_offsets_to_pointer() {
        let registry = registry();
        let (mut graph, a, b, _) = chain(&registry);
        let mut selection = SelectionManager::new();
        selection.extend(&mut graph, vec![a, b], false);
        let payload = copy_selection(&graph, &selection);

        let new_ids = paste(&mut graph, &registry, &payload, (50.0, 70.0)).unwrap();

        // min corner (a at 100,100) lands on the pointer, relative
        // offsets preserved
        assert_eq!(graph.node(new_ids[0]).unwrap().pos, (50.0, 70.0));
        assert_eq!(graph.node(new_ids[1]).unwrap().pos, (350.0, 90.0));
    }

    #[test]
    fn test_paste_twice_creates_disjoint_subgraphs() {
        let registry = registry();
        let (mut graph, a, b, _) = chain(&registry);
        let mut selection = SelectionManager::new();
        selection.extend(&mut graph, vec![a, b], false);
        let payload = copy_selection(&graph, &selection);

        let first = paste(&mut graph, &registry, &payload, (0.0, 0.0)).unwrap();
        let second = paste(&mut graph, &registry, &payload, (0.0, 500.0)).unwrap();

        assert!(first.iter().all(|id| !second.contains(id)));
        assert_eq!(graph.node_count(), 7);
        assert_eq!(graph.link_count(), 4);
    }

    #[test]
    fn test_paste_rolls_back_on_capacity() {
        let registry = registry();
        let (mut graph, a, b, _) = chain(&registry);
        let mut selection = SelectionManager::new();
        selection.extend(&mut graph, vec![a, b], false);
        let payload = copy_selection(&graph, &selection);

        graph.config.max_nodes = 4; // room for one of the two nodes
        let result = paste(&mut graph, &registry, &payload, (0.0, 0.0));

        assert!(result.is_err());
        assert_eq!(graph.node_count(), 3); // rollback removed the partial paste
    }

    #[test]
    fn test_empty_payload_is_noop() {
        let registry = registry();
        let (mut graph, ..) = chain(&registry);
        let payload = ClipboardPayload {
            nodes: Vec::new(),
            links: Vec::new(),
        };
        assert!(paste(&mut graph, &registry, &payload, (0.0, 0.0))
            .unwrap()
            .is_empty());
    }
}
