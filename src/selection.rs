//! Selection state with O(1) membership tests.
//!
//! The selection set lives outside the graph (each canvas attached to a
//! graph keeps its own), but it mirrors itself into the nodes' `selected`
//! flags so the renderer can read selection without a second lookup.

use std::collections::HashSet;

use slint::{Model, VecModel};

use crate::graph::Graph;
use crate::node::NodeId;

/// Set of selected node ids for one canvas.
#[derive(Debug, Default)]
pub struct SelectionManager {
    selected: HashSet<NodeId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.selected.iter().copied()
    }

    /// Ids sorted ascending, for deterministic iteration in bulk edits.
    pub fn sorted(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.selected.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Click selection. Without `additive`, the clicked node becomes the
    /// only selection; with it (shift/ctrl click) membership toggles.
    pub fn handle_click(&mut self, graph: &mut Graph, id: NodeId, additive: bool) {
        if additive {
            if self.selected.contains(&id) {
                self.selected.remove(&id);
            } else {
                self.selected.insert(id);
            }
        } else {
            if self.selected.len() == 1 && self.selected.contains(&id) {
                return;
            }
            self.selected.clear();
            self.selected.insert(id);
        }
        self.sync_flags(graph);
    }

    /// Add several ids (rectangle selection); without `additive` the set
    /// is replaced.
    pub fn extend(&mut self, graph: &mut Graph, ids: impl IntoIterator<Item = NodeId>, additive: bool) {
        if !additive {
            self.selected.clear();
        }
        self.selected.extend(ids);
        self.sync_flags(graph);
    }

    /// Select every node in the graph.
    pub fn select_all(&mut self, graph: &mut Graph) {
        self.selected = graph.z_order().iter().copied().collect();
        self.sync_flags(graph);
    }

    pub fn clear(&mut self, graph: &mut Graph) {
        self.selected.clear();
        self.sync_flags(graph);
    }

    /// Drop ids that no longer resolve (after node removal).
    pub fn prune(&mut self, graph: &Graph) {
        self.selected.retain(|id| graph.node(*id).is_some());
    }

    fn sync_flags(&self, graph: &mut Graph) {
        let ids: Vec<NodeId> = graph.z_order().to_vec();
        for id in ids {
            if let Some(node) = graph.node_mut(id) {
                node.selected = self.selected.contains(&id);
            }
        }
    }

    /// Mirror the selection into a Slint model of node ids (truncated to
    /// `i32` for the UI layer).
    pub fn sync_to_model(&self, model: &VecModel<i32>) {
        while model.row_count() > 0 {
            model.remove(0);
        }
        for id in self.sorted() {
            model.push(id as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use std::rc::Rc;

    fn graph_with_nodes(count: usize) -> (Graph, Vec<NodeId>) {
        let mut graph = Graph::new();
        let ids = (0..count)
            .map(|i| {
                graph
                    .add_node(Node::new("test/node", format!("N{i}")))
                    .unwrap()
            })
            .collect();
        (graph, ids)
    }

    // ========================================================================
    // Click selection
    // ========================================================================

    #[test]
    fn test_click_selects_single() {
        let (mut graph, ids) = graph_with_nodes(2);
        let mut selection = SelectionManager::new();
        selection.handle_click(&mut graph, ids[0], false);

        assert!(selection.contains(ids[0]));
        assert_eq!(selection.len(), 1);
        assert!(graph.node(ids[0]).unwrap().selected);
        assert!(!graph.node(ids[1]).unwrap().selected);
    }

    #[test]
    fn test_click_replaces_selection() {
        let (mut graph, ids) = graph_with_nodes(2);
        let mut selection = SelectionManager::new();
        selection.handle_click(&mut graph, ids[0], false);
        selection.handle_click(&mut graph, ids[1], false);

        assert!(!selection.contains(ids[0]));
        assert!(selection.contains(ids[1]));
        assert!(!graph.node(ids[0]).unwrap().selected);
    }

    #[test]
    fn test_additive_click_toggles() {
        let (mut graph, ids) = graph_with_nodes(2);
        let mut selection = SelectionManager::new();
        selection.handle_click(&mut graph, ids[0], false);
        selection.handle_click(&mut graph, ids[1], true);
        assert_eq!(selection.len(), 2);

        selection.handle_click(&mut graph, ids[0], true);
        assert!(!selection.contains(ids[0]));
        assert!(selection.contains(ids[1]));
    }

    #[test]
    fn test_click_on_selected_multi_collapses() {
        let (mut graph, ids) = graph_with_nodes(3);
        let mut selection = SelectionManager::new();
        selection.extend(&mut graph, ids.clone(), false);
        assert_eq!(selection.len(), 3);

        selection.handle_click(&mut graph, ids[1], false);
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(ids[1]));
    }

    // ========================================================================
    // Bulk operations
    // ========================================================================

    #[test]
    fn test_extend_replaces_or_adds() {
        let (mut graph, ids) = graph_with_nodes(3);
        let mut selection = SelectionManager::new();
        selection.extend(&mut graph, vec![ids[0]], false);
        selection.extend(&mut graph, vec![ids[1], ids[2]], true);
        assert_eq!(selection.len(), 3);

        selection.extend(&mut graph, vec![ids[0]], false);
        assert_eq!(selection.len(), 1);
        assert!(!graph.node(ids[2]).unwrap().selected);
    }

    #[test]
    fn test_select_all_and_clear() {
        let (mut graph, ids) = graph_with_nodes(3);
        let mut selection = SelectionManager::new();
        selection.select_all(&mut graph);
        assert_eq!(selection.len(), 3);
        assert!(ids.iter().all(|&id| graph.node(id).unwrap().selected));

        selection.clear(&mut graph);
        assert!(selection.is_empty());
        assert!(ids.iter().all(|&id| !graph.node(id).unwrap().selected));
    }

    #[test]
    fn test_prune_drops_removed_nodes() {
        let (mut graph, ids) = graph_with_nodes(2);
        let mut selection = SelectionManager::new();
        selection.select_all(&mut graph);

        graph.remove_node(ids[0]);
        selection.prune(&graph);

        assert_eq!(selection.len(), 1);
        assert!(selection.contains(ids[1]));
    }

    #[test]
    fn test_sorted_is_deterministic() {
        let (mut graph, ids) = graph_with_nodes(3);
        let mut selection = SelectionManager::new();
        selection.extend(&mut graph, vec![ids[2], ids[0], ids[1]], false);
        assert_eq!(selection.sorted(), ids);
    }

    // ========================================================================
    // Slint model sync
    // ========================================================================

    #[test]
    fn test_sync_to_model_replaces_rows() {
        let (mut graph, ids) = graph_with_nodes(2);
        let mut selection = SelectionManager::new();
        selection.select_all(&mut graph);

        let model: Rc<VecModel<i32>> = Rc::new(VecModel::from(vec![99, 98, 97]));
        selection.sync_to_model(&model);

        assert_eq!(model.row_count(), 2);
        let rows: Vec<i32> = (0..model.row_count()).filter_map(|i| model.row_data(i)).collect();
        assert_eq!(rows, ids.iter().map(|&id| id as i32).collect::<Vec<_>>());
    }
}
