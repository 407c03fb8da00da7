//! The graph aggregate: owns nodes, links and groups, computes execution
//! order, and drives the step scheduler.
//!
//! All ownership lives here. Nodes refer to links by id, links refer to
//! nodes by id, and every structural mutation (add/remove/connect/
//! disconnect) bumps a monotonically increasing version counter so
//! observers can detect change without diffing.
//!
//! # Example
//!
//! ```ignore
//! use slint_graph_canvas::{Graph, Node};
//!
//! let mut graph = Graph::new();
//! let mut a = Node::new("source/const", "Const");
//! a.add_output("value", "number");
//! let mut b = Node::new("sink/print", "Print");
//! b.add_input("value", "number");
//!
//! let a = graph.add_node(a).unwrap();
//! let b = graph.add_node(b).unwrap();
//! let link = graph.connect(a, 0, b, 0).unwrap();
//! assert_eq!(graph.link(link).unwrap().origin_id, a);
//! ```

use std::cell::Cell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result, StepFault};
use crate::group::Group;
use crate::link::{is_valid_connection, Link, LinkId};
use crate::node::{Node, NodeId, NodeMode, StepContext, NODE_TITLE_HEIGHT};

/// Default node capacity. Exceeding it is a hard error because the render
/// and selection structures assume a bounded population.
pub const MAX_NODES_DEFAULT: usize = 1000;

/// Seconds added to the fixed-time accumulator per step pass.
pub const FIXED_TIME_STEP: f64 = 1.0 / 60.0;

/// How node ids are assigned when a node without one is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMode {
    /// Sequential ids from a per-graph counter.
    #[default]
    Monotonic,
    /// Random ids derived from UUIDs, for graphs merged across documents.
    Random,
}

/// Per-graph configuration, persisted with the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub align_to_grid: bool,
    pub id_mode: IdMode,
    pub max_nodes: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            align_to_grid: false,
            id_mode: IdMode::Monotonic,
            max_nodes: MAX_NODES_DEFAULT,
        }
    }
}

/// Cadence of the step loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepInterval {
    /// One step per host frame callback.
    EveryFrame,
    /// One step every `n` milliseconds, skipping frames in between.
    Millis(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphStatus {
    Running,
    #[default]
    Stopped,
}

/// Shared cancellation token for the step loop.
///
/// `stop()` cancels the current token; a tick that was already scheduled
/// by the host observes the cancellation and does nothing. `start()`
/// issues a fresh token so stale ticks from a previous run can never
/// execute work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Direction used by [`Graph::arrange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutDirection {
    /// Execution layers flow left to right.
    #[default]
    Horizontal,
    /// Execution layers flow top to bottom.
    Vertical,
}

/// The aggregate root. See the module docs for the ownership rules.
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    /// Insertion order; also the default render z-order.
    z_order: Vec<NodeId>,
    links: HashMap<LinkId, Link>,
    groups: Vec<Group>,

    last_node_id: NodeId,
    last_link_id: LinkId,
    version: u64,

    nodes_in_order: Vec<NodeId>,
    nodes_executable: Vec<NodeId>,

    pub config: GraphConfig,
    pub extra: serde_json::Value,

    // step loop
    status: GraphStatus,
    cancel: CancelToken,
    interval: StepInterval,
    /// Catch step faults and stop the loop instead of propagating them.
    pub catch_errors: bool,
    start_time: Option<f64>,
    last_update_time: Option<f64>,
    next_step_due: Option<f64>,
    global_time: f64,
    fixed_time: f64,
    elapsed_time: f64,
    iteration: u64,
    last_error: Option<StepFault>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            z_order: Vec::new(),
            links: HashMap::new(),
            groups: Vec::new(),
            last_node_id: 0,
            last_link_id: 0,
            version: 0,
            nodes_in_order: Vec::new(),
            nodes_executable: Vec::new(),
            config: GraphConfig::default(),
            extra: serde_json::Value::Null,
            status: GraphStatus::Stopped,
            cancel: CancelToken::new(),
            interval: StepInterval::EveryFrame,
            catch_errors: true,
            start_time: None,
            last_update_time: None,
            next_step_due: None,
            global_time: 0.0,
            fixed_time: 0.0,
            elapsed_time: 0.0,
            iteration: 0,
            last_error: None,
        }
    }

    /// Remove every node, link and group. The version counter keeps
    /// increasing so observers never see it move backwards.
    pub fn clear(&mut self) {
        self.stop();
        self.nodes.clear();
        self.z_order.clear();
        self.links.clear();
        self.groups.clear();
        self.last_node_id = 0;
        self.last_link_id = 0;
        self.nodes_in_order.clear();
        self.nodes_executable.clear();
        self.extra = serde_json::Value::Null;
        self.global_time = 0.0;
        self.fixed_time = 0.0;
        self.elapsed_time = 0.0;
        self.iteration = 0;
        self.last_error = None;
        self.version += 1;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Monotonically increasing change counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable access to a node's non-structural state (position, flags,
    /// properties, widget values). Structural changes must go through the
    /// graph's own mutation API.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node ids in insertion / z-order (back of the slice is front-most).
    pub fn z_order(&self) -> &[NodeId] {
        &self.z_order
    }

    /// Nodes in z-order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.z_order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group_mut(&mut self, index: usize) -> Option<&mut Group> {
        self.groups.get_mut(index)
    }

    /// Node ids in computed execution order.
    pub fn nodes_in_order(&self) -> &[NodeId] {
        &self.nodes_in_order
    }

    /// Subset of the execution order whose behavior exposes a step.
    pub fn nodes_executable(&self) -> &[NodeId] {
        &self.nodes_executable
    }

    pub(crate) fn last_node_id(&self) -> NodeId {
        self.last_node_id
    }

    pub(crate) fn last_link_id(&self) -> LinkId {
        self.last_link_id
    }

    pub(crate) fn set_id_counters(&mut self, last_node_id: NodeId, last_link_id: LinkId) {
        self.last_node_id = last_node_id;
        self.last_link_id = last_link_id;
    }

    pub(crate) fn insert_link_raw(&mut self, link: Link) {
        if link.id > self.last_link_id {
            self.last_link_id = link.id;
        }
        self.links.insert(link.id, link);
    }

    // ========================================================================
    // Node management
    // ========================================================================

    /// Add a node, assigning an id if it has none (or a colliding one).
    /// Fails hard when the configured capacity is reached.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId> {
        self.add_node_internal(node, false)
    }

    pub(crate) fn add_node_internal(&mut self, mut node: Node, skip_order: bool) -> Result<NodeId> {
        if self.nodes.len() >= self.config.max_nodes {
            return Err(GraphError::NodeLimit {
                max: self.config.max_nodes,
            });
        }

        if node.id != 0 && self.nodes.contains_key(&node.id) {
            log::warn!("node id {} already present, assigning a fresh one", node.id);
            node.id = 0;
        }
        if node.id == 0 {
            node.id = self.assign_node_id();
        } else if node.id > self.last_node_id {
            self.last_node_id = node.id;
        }
        let id = node.id;

        if self.config.align_to_grid {
            node.align_to_grid();
        }

        self.z_order.push(id);
        self.nodes.insert(id, node);
        self.version += 1;

        if let Some(behavior) = self.nodes.get(&id).and_then(|n| n.behavior.clone()) {
            if let Some(node) = self.nodes.get_mut(&id) {
                behavior.on_added(node);
            }
        }

        if !skip_order {
            self.update_execution_order();
        }
        Ok(id)
    }

    fn assign_node_id(&mut self) -> NodeId {
        match self.config.id_mode {
            IdMode::Monotonic => {
                self.last_node_id += 1;
                self.last_node_id
            }
            IdMode::Random => loop {
                let id = uuid::Uuid::new_v4().as_u128() as NodeId;
                if id != 0 && !self.nodes.contains_key(&id) {
                    break id;
                }
            },
        }
    }

    /// Remove a node, detaching every link that touches it first. Returns
    /// whether the node existed.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };

        let input_count = node.inputs.len();
        let output_count = node.outputs.len();
        for slot in 0..input_count {
            self.disconnect_input(id, slot);
        }
        for slot in 0..output_count {
            self.disconnect_output(id, slot);
        }

        if let Some(behavior) = self.nodes.get(&id).and_then(|n| n.behavior.clone()) {
            if let Some(node) = self.nodes.get_mut(&id) {
                behavior.on_removed(node);
            }
        }

        self.z_order.retain(|&n| n != id);
        self.nodes.remove(&id);
        self.version += 1;
        self.update_execution_order();
        true
    }

    /// Move a node to the end of the z-order so it renders on top.
    pub fn bring_to_front(&mut self, id: NodeId) {
        if let Some(pos) = self.z_order.iter().position(|&n| n == id) {
            self.z_order.remove(pos);
            self.z_order.push(id);
        }
    }

    /// Top-most node whose bounds (plus margin) contain the point.
    pub fn node_on_pos(&self, x: f32, y: f32, margin: f32) -> Option<NodeId> {
        self.z_order
            .iter()
            .rev()
            .find(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| n.is_point_inside(x, y, margin))
            })
            .copied()
    }

    /// All nodes of a type, compared case-insensitively.
    pub fn find_nodes_by_type(&self, type_name: &str) -> Vec<NodeId> {
        self.z_order
            .iter()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| n.type_name.eq_ignore_ascii_case(type_name))
            })
            .copied()
            .collect()
    }

    /// First node whose title matches exactly.
    pub fn find_node_by_title(&self, title: &str) -> Option<NodeId> {
        self.z_order
            .iter()
            .find(|id| self.nodes.get(id).is_some_and(|n| n.title == title))
            .copied()
    }

    pub fn find_nodes_by_title(&self, title: &str) -> Vec<NodeId> {
        self.z_order
            .iter()
            .filter(|id| self.nodes.get(id).is_some_and(|n| n.title == title))
            .copied()
            .collect()
    }

    // ========================================================================
    // Link management
    // ========================================================================

    /// Connect an output slot to an input slot.
    ///
    /// Returns `None` (and logs at debug level) when the endpoints do not
    /// resolve, the slot types are incompatible, or origin and target are
    /// the same node. An input holds at most one link, so connecting over
    /// an occupied input detaches the previous link first.
    pub fn connect(
        &mut self,
        origin: NodeId,
        origin_slot: usize,
        target: NodeId,
        target_slot: usize,
    ) -> Option<LinkId> {
        if origin == target {
            log::debug!("connect rejected: cannot connect node {origin} to itself");
            return None;
        }

        let origin_ty = {
            let node = self.nodes.get(&origin)?;
            node.outputs.get(origin_slot)?.ty.clone()
        };
        let target_ty = {
            let node = self.nodes.get(&target)?;
            node.inputs.get(target_slot)?.ty.clone()
        };

        if !is_valid_connection(&origin_ty, &target_ty) {
            log::debug!(
                "connect rejected: {origin}:{origin_slot} ({origin_ty}) -> {target}:{target_slot} ({target_ty})"
            );
            return None;
        }

        // an input holds a single link
        if self.nodes.get(&target)?.inputs[target_slot].link.is_some() {
            self.disconnect_input(target, target_slot);
        }

        self.last_link_id += 1;
        let link_id = self.last_link_id;
        self.links.insert(
            link_id,
            Link::new(link_id, origin, origin_slot, target, target_slot, origin_ty),
        );
        if let Some(node) = self.nodes.get_mut(&origin) {
            node.outputs[origin_slot].links.push(link_id);
        }
        if let Some(node) = self.nodes.get_mut(&target) {
            node.inputs[target_slot].link = Some(link_id);
        }

        self.notify_connections_change(origin);
        self.notify_connections_change(target);
        self.version += 1;
        self.update_execution_order();
        Some(link_id)
    }

    /// Detach the link feeding an input slot. Returns whether a link was
    /// removed.
    pub fn disconnect_input(&mut self, node_id: NodeId, slot: usize) -> bool {
        let link_id = match self
            .nodes
            .get_mut(&node_id)
            .and_then(|n| n.inputs.get_mut(slot))
            .and_then(|s| s.link.take())
        {
            Some(id) => id,
            None => return false,
        };

        if let Some(link) = self.links.remove(&link_id) {
            if let Some(origin) = self.nodes.get_mut(&link.origin_id) {
                if let Some(output) = origin.outputs.get_mut(link.origin_slot) {
                    output.links.retain(|&l| l != link_id);
                }
            }
            self.notify_connections_change(link.origin_id);
        }
        self.notify_connections_change(node_id);
        self.version += 1;
        self.update_execution_order();
        true
    }

    /// Detach every link fanning out of an output slot. Returns whether
    /// any link was removed.
    pub fn disconnect_output(&mut self, node_id: NodeId, slot: usize) -> bool {
        let link_ids = match self
            .nodes
            .get_mut(&node_id)
            .and_then(|n| n.outputs.get_mut(slot))
        {
            Some(output) if !output.links.is_empty() => std::mem::take(&mut output.links),
            _ => return false,
        };

        let mut touched = HashSet::new();
        for link_id in link_ids {
            if let Some(link) = self.links.remove(&link_id) {
                if let Some(target) = self.nodes.get_mut(&link.target_id) {
                    if let Some(input) = target.inputs.get_mut(link.target_slot) {
                        if input.link == Some(link_id) {
                            input.link = None;
                        }
                    }
                }
                touched.insert(link.target_id);
            }
        }
        for id in touched {
            self.notify_connections_change(id);
        }
        self.notify_connections_change(node_id);
        self.version += 1;
        self.update_execution_order();
        true
    }

    /// Remove a link by id (detaches it from the target input).
    pub fn remove_link(&mut self, link_id: LinkId) -> bool {
        match self.links.get(&link_id) {
            Some(link) => self.disconnect_input(link.target_id, link.target_slot),
            None => false,
        }
    }

    /// Node feeding the given input slot, if connected.
    pub fn get_input_node(&self, node_id: NodeId, slot: usize) -> Option<NodeId> {
        let link_id = self.nodes.get(&node_id)?.inputs.get(slot)?.link?;
        Some(self.links.get(&link_id)?.origin_id)
    }

    /// Nodes fed by the given output slot.
    pub fn get_output_nodes(&self, node_id: NodeId, slot: usize) -> Vec<NodeId> {
        let Some(output) = self.nodes.get(&node_id).and_then(|n| n.outputs.get(slot)) else {
            return Vec::new();
        };
        output
            .links
            .iter()
            .filter_map(|id| self.links.get(id))
            .map(|l| l.target_id)
            .collect()
    }

    fn notify_connections_change(&mut self, id: NodeId) {
        if let Some(behavior) = self.nodes.get(&id).and_then(|n| n.behavior.clone()) {
            if let Some(node) = self.nodes.get_mut(&id) {
                behavior.on_connections_change(node);
            }
        }
    }

    // ========================================================================
    // Groups
    // ========================================================================

    pub fn add_group(&mut self, group: Group) -> usize {
        self.groups.push(group);
        self.version += 1;
        self.groups.len() - 1
    }

    pub fn remove_group(&mut self, index: usize) -> bool {
        if index >= self.groups.len() {
            return false;
        }
        self.groups.remove(index);
        self.version += 1;
        true
    }

    /// Top-most group containing the point.
    pub fn group_on_pos(&self, x: f32, y: f32) -> Option<usize> {
        self.groups
            .iter()
            .enumerate()
            .rev()
            .find(|(_, g)| g.is_point_inside(x, y, 2.0))
            .map(|(i, _)| i)
    }

    /// Current membership of a group (recomputed, never stored).
    pub fn group_nodes(&self, index: usize) -> Vec<NodeId> {
        match self.groups.get(index) {
            Some(group) => group.captured_nodes(self.nodes().map(|n| (n.id, n.bounding()))),
            None => Vec::new(),
        }
    }

    // ========================================================================
    // Execution order
    // ========================================================================

    /// Kahn-style topological sort over live links.
    ///
    /// Nodes caught in cycles are appended at the end in registration
    /// order instead of aborting; the editor must keep working on a graph
    /// that is transiently invalid mid-edit. The result is stable-sorted
    /// by node priority afterwards.
    pub fn compute_execution_order(&self) -> Vec<NodeId> {
        let mut result: Vec<NodeId> = Vec::with_capacity(self.z_order.len());
        let mut ready: VecDeque<NodeId> = VecDeque::new();
        let mut remaining_inputs: HashMap<NodeId, usize> = HashMap::new();
        let mut visited_links: HashSet<LinkId> = HashSet::new();
        let mut placed: HashSet<NodeId> = HashSet::new();

        for &id in &self.z_order {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let live_inputs = node
                .inputs
                .iter()
                .filter(|slot| slot.link.is_some_and(|l| self.links.contains_key(&l)))
                .count();
            if live_inputs == 0 {
                ready.push_back(id);
            } else {
                remaining_inputs.insert(id, live_inputs);
            }
        }

        while let Some(id) = ready.pop_front() {
            result.push(id);
            placed.insert(id);

            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            for output in &node.outputs {
                for &link_id in &output.links {
                    let Some(link) = self.links.get(&link_id) else {
                        continue;
                    };
                    if !visited_links.insert(link_id) {
                        continue;
                    }
                    if let Some(count) = remaining_inputs.get_mut(&link.target_id) {
                        if *count > 0 {
                            *count -= 1;
                            if *count == 0 {
                                ready.push_back(link.target_id);
                            }
                        }
                    }
                }
            }
        }

        // cycle remainder, in registration order
        for &id in &self.z_order {
            if !placed.contains(&id) && self.nodes.contains_key(&id) {
                result.push(id);
            }
        }

        // stable sort keeps the topological order for equal priorities
        result.sort_by_key(|id| self.nodes.get(id).map_or(0, |n| n.priority));
        result
    }

    /// Recompute the order caches and renumber every node's `order` field.
    pub fn update_execution_order(&mut self) {
        let order = self.compute_execution_order();
        for (index, id) in order.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.order = index;
            }
        }
        self.nodes_executable = order
            .iter()
            .filter(|id| self.nodes.get(id).is_some_and(Node::has_step))
            .copied()
            .collect();
        self.nodes_in_order = order;
    }

    /// Every transitive dependency of a node (excluding itself), sorted by
    /// execution order. Breadth-first over input links.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result: Vec<NodeId> = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut pending: VecDeque<NodeId> = VecDeque::from([id]);

        while let Some(current) = pending.pop_front() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            if current != id && visited.insert(current) {
                result.push(current);
            }
            for slot in 0..node.inputs.len() {
                if let Some(input) = self.get_input_node(current, slot) {
                    if input != id && !visited.contains(&input) {
                        pending.push_back(input);
                    }
                }
            }
        }

        result.sort_by_key(|id| self.nodes.get(id).map_or(0, |n| n.order));
        result
    }

    /// Re-position every node into execution-level columns.
    pub fn arrange(&mut self, margin: f32, direction: LayoutDirection) {
        self.update_execution_order();

        // level = 1 + max level of live inputs; a single pass over the
        // topological order suffices (cycle remainders default to level 1)
        let mut levels: HashMap<NodeId, usize> = HashMap::new();
        let order = self.nodes_in_order.clone();
        for &id in &order {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let mut level = 1;
            for slot in 0..node.inputs.len() {
                if let Some(input) = self.get_input_node(id, slot) {
                    level = level.max(levels.get(&input).copied().unwrap_or(0) + 1);
                }
            }
            levels.insert(id, level);
        }

        let max_level = levels.values().copied().max().unwrap_or(0);
        let mut columns: Vec<Vec<NodeId>> = vec![Vec::new(); max_level + 1];
        for &id in &order {
            columns[levels.get(&id).copied().unwrap_or(1)].push(id);
        }

        let mut x = margin;
        for column in &columns {
            if column.is_empty() {
                continue;
            }
            let mut max_size = 100.0f32;
            let mut y = margin + NODE_TITLE_HEIGHT;
            for &id in column {
                let Some(node) = self.nodes.get_mut(&id) else {
                    continue;
                };
                match direction {
                    LayoutDirection::Horizontal => {
                        node.pos = (x, y);
                        max_size = max_size.max(node.size.0);
                        y += node.size.1 + margin + NODE_TITLE_HEIGHT;
                    }
                    LayoutDirection::Vertical => {
                        node.pos = (y, x);
                        max_size = max_size.max(node.size.1);
                        y += node.size.0 + margin + NODE_TITLE_HEIGHT;
                    }
                }
            }
            x += max_size + margin;
        }
    }

    // ========================================================================
    // Step loop
    // ========================================================================

    pub fn status(&self) -> GraphStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == GraphStatus::Running
    }

    /// Token observed by the current run; cancelled by [`stop`](Self::stop).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Fault recorded by the last guarded run, if any.
    pub fn last_error(&self) -> Option<&StepFault> {
        self.last_error.as_ref()
    }

    /// Wall-clock seconds the graph has been running.
    pub fn global_time(&self) -> f64 {
        self.global_time
    }

    /// Fixed-step accumulator (constant increments per pass).
    pub fn fixed_time(&self) -> f64 {
        self.fixed_time
    }

    /// Completed step passes.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Begin running. The host drives the loop by calling
    /// [`tick`](Self::tick) from its frame callback; `interval` decides
    /// whether every frame steps or only those past the millisecond gate.
    pub fn start(&mut self, interval: StepInterval) {
        if self.status == GraphStatus::Running {
            return;
        }
        self.status = GraphStatus::Running;
        self.cancel = CancelToken::new();
        self.interval = interval;
        self.start_time = None;
        self.last_update_time = None;
        self.next_step_due = None;
        self.last_error = None;
    }

    /// Stop the loop. Idempotent, safe to call from inside a step
    /// callback (via [`StepContext::request_stop`]), and guarantees that
    /// any tick already scheduled by the host does nothing.
    pub fn stop(&mut self) {
        if self.status == GraphStatus::Stopped {
            return;
        }
        self.status = GraphStatus::Stopped;
        self.cancel.cancel();
        self.next_step_due = None;
    }

    /// One host frame. Returns whether a step pass ran.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if self.status != GraphStatus::Running || self.cancel.is_cancelled() {
            return false;
        }
        if let StepInterval::Millis(interval) = self.interval {
            match self.next_step_due {
                Some(due) if now_ms < due => return false,
                _ => self.next_step_due = Some(now_ms + interval as f64),
            }
        }

        let start = *self.start_time.get_or_insert(now_ms);
        self.global_time = (now_ms - start) * 0.001;
        self.elapsed_time = self
            .last_update_time
            .map_or(0.0, |last| (now_ms - last) * 0.001);
        self.last_update_time = Some(now_ms);

        let unguarded = !self.catch_errors;
        // in unguarded mode the host asked for raw faults; the tick driver
        // has no caller to hand them to, so they are dropped here
        let _ = self.run_step(1, unguarded);
        true
    }

    /// Execute `num` passes over the executable nodes whose mode is
    /// `Always`.
    ///
    /// Guarded (default): a step fault is recorded as
    /// [`last_error`](Self::last_error), the loop stops, and `Ok(())` is
    /// returned — mutations applied by earlier steps stay intact.
    /// Unguarded: the fault is returned to the caller and nothing is
    /// recorded or stopped (used for debugging).
    pub fn run_step(&mut self, num: usize, unguarded: bool) -> std::result::Result<(), StepFault> {
        let ids = self.nodes_executable.clone();
        for _ in 0..num.max(1) {
            for &id in &ids {
                if self.cancel.is_cancelled() && self.status == GraphStatus::Stopped {
                    return Ok(());
                }
                let Some(node) = self.nodes.get(&id) else {
                    continue;
                };
                if node.mode != NodeMode::Always {
                    continue;
                }
                let Some(behavior) = node.behavior.clone() else {
                    continue;
                };

                let mut ctx = StepContext {
                    global_time: self.global_time,
                    fixed_time: self.fixed_time,
                    elapsed_time: self.elapsed_time,
                    iteration: self.iteration,
                    ..Default::default()
                };
                let result = {
                    let node = self.nodes.get_mut(&id).expect("node present");
                    behavior.step(node, &mut ctx)
                };

                if let Err(message) = result {
                    let fault = StepFault { node: id, message };
                    if unguarded {
                        return Err(fault);
                    }
                    log::warn!("step loop stopped: {fault}");
                    self.last_error = Some(fault);
                    self.stop();
                    return Ok(());
                }
                if ctx.stop_requested() {
                    self.stop();
                    return Ok(());
                }
            }
            self.fixed_time += FIXED_TIME_STEP;
        }
        self.iteration += 1;
        Ok(())
    }
}
