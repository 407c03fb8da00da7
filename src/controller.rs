//! Pointer/keyboard gesture state machine.
//!
//! The controller interprets raw pointer and key events, mutates the
//! graph and viewport through their public APIs, marks render layers
//! dirty, and surfaces collaborator calls (menus, search, panels) as
//! [`UiRequest`] values the host drains after each event.
//!
//! Exactly one gesture can be active at a time: pointer-down enters a
//! state, pointer-up (or Escape) returns to `Idle` with all transient
//! fields cleared. A second pointer-down while a gesture is active is
//! ignored, never interleaved.

use crate::geometry::{distance, Rect};
use crate::graph::Graph;
use crate::hit_test::{
    find_compatible_input, find_compatible_output, input_slot_at, output_slot_at,
    resolve_pointer_down, Hit, NODE_HIT_MARGIN,
};
use crate::link::{is_valid_connection, LinkId};
use crate::node::{Corner, NodeId, WidgetKind};
use crate::render::{OverlayState, PendingLink, RenderPipeline, SlotRef};
use crate::selection::SelectionManager;
use crate::viewport::Viewport;
use crate::path::LinkDirection;

/// Pointer movement below this (screen pixels) still counts as a click.
pub const CLICK_DISTANCE: f32 = 1.0;
/// Press-to-release time below this (ms) counts as a click.
pub const CLICK_TIME_MS: f64 = 800.0;
/// Two pointer-downs within this window (ms) form a double-click.
pub const DOUBLE_CLICK_MS: f64 = 300.0;
/// Per-notch wheel zoom factor.
pub const WHEEL_ZOOM_STEP: f32 = 1.1;
/// Selection rectangles smaller than this on both axes fall back to a
/// plain click.
pub const SELECTION_RECT_MIN: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

/// One pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pos: (f32, f32),
    pub button: PointerButton,
    pub modifiers: Modifiers,
    /// Host timestamp in milliseconds, used for click/double-click
    /// discrimination (tests pass synthetic clocks).
    pub time_ms: f64,
}

impl PointerEvent {
    pub fn new(pos: (f32, f32), time_ms: f64) -> Self {
        Self {
            pos,
            button: PointerButton::Left,
            modifiers: Modifiers::default(),
            time_ms,
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Keys the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    Space,
    A,
}

/// Active tool: `Move` pans on empty canvas, `Select` starts a selection
/// rectangle there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Move,
    Select,
}

/// Collaborator calls produced by gestures; the host drains these with
/// [`InputController::take_requests`] and opens its own UI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiRequest {
    /// Right-click; `node` is the node under the cursor, if any.
    ContextMenu { pos: (f32, f32), node: Option<NodeId> },
    /// Double-click on a node body.
    NodePanel { node: NodeId },
    /// Link released over empty canvas.
    QuickConnectMenu { pos: (f32, f32), from: SlotRef },
    /// Link released over empty canvas with the search modifier, or
    /// double-click on empty canvas (no filter).
    SearchBox {
        pos: (f32, f32),
        type_filter: Option<String>,
        from: Option<SlotRef>,
    },
    /// Click on a link's center marker.
    LinkMenu { link: LinkId, pos: (f32, f32) },
    /// Escape: the host should close any open panels.
    ClosePanels,
}

/// The mutually exclusive gesture states.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    PanningCanvas,
    DraggingNodes,
    SelectionRect {
        origin: (f32, f32),
    },
    DraggingGroup {
        group: usize,
        resizing: bool,
        nodes: Vec<NodeId>,
    },
    Connecting {
        from: SlotRef,
        ty: String,
    },
    ResizingNode {
        node: NodeId,
        corner: Corner,
    },
}

/// The gesture state machine for one canvas.
pub struct InputController {
    state: DragState,
    pub selection: SelectionManager,
    pub overlay: OverlayState,
    pub tool: Tool,

    pub allow_interaction: bool,
    pub read_only: bool,
    pub live_mode: bool,
    pub allow_drag_canvas: bool,
    pub allow_drag_nodes: bool,
    /// Dragging from an occupied input detaches and re-plugs the link.
    pub allow_reconnect: bool,
    pub allow_searchbox: bool,
    pub align_to_grid: bool,

    pointer_is_down: bool,
    space_held: bool,
    last_mouse: (f32, f32),
    pointer_down_screen: Option<(f32, f32)>,
    pointer_down_at: f64,
    previous_down_at: f64,
    requests: Vec<UiRequest>,
}

impl Default for InputController {
    fn default() -> Self {
        Self::new()
    }
}

impl InputController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
            selection: SelectionManager::new(),
            overlay: OverlayState::default(),
            tool: Tool::Move,
            allow_interaction: true,
            read_only: false,
            live_mode: false,
            allow_drag_canvas: true,
            allow_drag_nodes: true,
            allow_reconnect: false,
            allow_searchbox: true,
            align_to_grid: false,
            pointer_is_down: false,
            space_held: false,
            last_mouse: (0.0, 0.0),
            pointer_down_screen: None,
            pointer_down_at: 0.0,
            previous_down_at: f64::MIN,
            requests: Vec::new(),
        }
    }

    pub fn drag_state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    /// Collaborator calls accumulated since the last drain.
    pub fn take_requests(&mut self) -> Vec<UiRequest> {
        std::mem::take(&mut self.requests)
    }

    // ========================================================================
    // Pointer down
    // ========================================================================

    pub fn pointer_down(
        &mut self,
        event: PointerEvent,
        graph: &mut Graph,
        viewport: &Viewport,
        pipeline: &mut RenderPipeline,
    ) {
        // handlers are non-reentrant: a second pointer-down during an
        // active gesture is dropped
        if self.pointer_is_down {
            return;
        }
        self.pointer_is_down = true;
        self.previous_down_at = self.pointer_down_at;
        self.pointer_down_at = event.time_ms;
        self.pointer_down_screen = Some(event.pos);
        self.last_mouse = event.pos;

        let pos = viewport.convert_canvas_to_offset(event.pos);
        let double_click = event.time_ms - self.previous_down_at < DOUBLE_CLICK_MS;

        match event.button {
            PointerButton::Left => {
                self.left_pointer_down(event, pos, double_click, graph, viewport, pipeline)
            }
            PointerButton::Middle => {
                if self.allow_drag_canvas {
                    self.state = DragState::PanningCanvas;
                }
            }
            PointerButton::Right => {
                let node = graph.node_on_pos(pos.0, pos.1, NODE_HIT_MARGIN);
                if let Some(id) = node {
                    let additive = event.modifiers.shift || event.modifiers.ctrl;
                    if !self.selection.contains(id) {
                        self.selection.handle_click(graph, id, additive);
                    }
                }
                self.requests.push(UiRequest::ContextMenu { pos, node });
                pipeline.mark_dirty(true, false);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn left_pointer_down(
        &mut self,
        event: PointerEvent,
        pos: (f32, f32),
        double_click: bool,
        graph: &mut Graph,
        viewport: &Viewport,
        pipeline: &mut RenderPipeline,
    ) {
        if self.space_held && self.allow_drag_canvas {
            self.state = DragState::PanningCanvas;
            return;
        }

        // rectangle selection: select tool with nothing selected, or Ctrl
        let wants_rect = !self.read_only
            && (event.modifiers.ctrl || (self.tool == Tool::Select && self.selection.is_empty()));
        if wants_rect {
            self.state = DragState::SelectionRect { origin: pos };
            self.overlay.selection_rect = Some(Rect::new(pos.0, pos.1, 1.0, 1.0));
            pipeline.mark_dirty(true, false);
            return;
        }

        let hit = resolve_pointer_down(graph, pos.0, pos.1, viewport.scale(), pipeline.link_centers());

        // alt-drag clones the node under the pointer and drags the copy
        if event.modifiers.alt && !self.read_only && self.allow_interaction {
            if let Hit::NodeBody { node } = hit {
                if let Some(original) = graph.node(node) {
                    let mut copy = original.duplicate();
                    copy.pos.0 += 5.0;
                    copy.pos.1 += 5.0;
                    if let Ok(new_id) = graph.add_node(copy) {
                        self.selection.handle_click(graph, new_id, false);
                        if self.allow_drag_nodes {
                            self.state = DragState::DraggingNodes;
                        }
                        pipeline.mark_dirty(true, true);
                        return;
                    }
                }
            }
        }

        let interactive = self.allow_interaction && !self.read_only && !self.live_mode;

        match hit {
            Hit::NodeResizeCorner { node, corner } if interactive => {
                self.state = DragState::ResizingNode { node, corner };
                pipeline.mark_dirty(true, false);
            }
            Hit::OutputSlot { node, slot } if interactive => {
                if event.modifiers.shift {
                    graph.disconnect_output(node, slot);
                    pipeline.mark_dirty(true, true);
                }
                self.begin_connect(graph, SlotRef { node, slot, is_input: false }, pos, pipeline);
            }
            Hit::InputSlot { node, slot } if interactive => {
                let occupied = graph
                    .node(node)
                    .and_then(|n| n.inputs.get(slot))
                    .and_then(|s| s.link);
                match occupied {
                    Some(link_id) if self.allow_reconnect || event.modifiers.shift => {
                        // detach and re-plug the far end from its origin
                        let link = graph.link(link_id).cloned();
                        graph.disconnect_input(node, slot);
                        if let Some(link) = link {
                            self.begin_connect(
                                graph,
                                SlotRef {
                                    node: link.origin_id,
                                    slot: link.origin_slot,
                                    is_input: false,
                                },
                                pos,
                                pipeline,
                            );
                        }
                        pipeline.mark_dirty(true, true);
                    }
                    _ => {
                        self.begin_connect(graph, SlotRef { node, slot, is_input: true }, pos, pipeline);
                    }
                }
            }
            // slot/resize hits on read-only canvases degrade to body hits
            Hit::NodeResizeCorner { node, .. }
            | Hit::OutputSlot { node, .. }
            | Hit::InputSlot { node, .. }
            | Hit::NodeBody { node } => {
                self.node_body_pointer_down(event, pos, double_click, node, graph, pipeline);
            }
            Hit::LinkCenter { link } => {
                if !self.read_only {
                    self.requests.push(UiRequest::LinkMenu { link, pos });
                }
            }
            Hit::GroupResizeCorner { group } if interactive => {
                self.state = DragState::DraggingGroup {
                    group,
                    resizing: true,
                    nodes: Vec::new(),
                };
                pipeline.mark_dirty(true, true);
            }
            Hit::GroupBody { group } if interactive => {
                let nodes = graph.group_nodes(group);
                self.state = DragState::DraggingGroup {
                    group,
                    resizing: false,
                    nodes,
                };
                pipeline.mark_dirty(true, true);
            }
            Hit::GroupResizeCorner { .. } | Hit::GroupBody { .. } | Hit::Canvas => {
                if double_click && self.allow_searchbox && !self.read_only {
                    self.requests.push(UiRequest::SearchBox {
                        pos,
                        type_filter: None,
                        from: None,
                    });
                } else if self.allow_drag_canvas {
                    self.state = DragState::PanningCanvas;
                }
            }
        }
    }

    fn node_body_pointer_down(
        &mut self,
        event: PointerEvent,
        pos: (f32, f32),
        double_click: bool,
        node_id: NodeId,
        graph: &mut Graph,
        pipeline: &mut RenderPipeline,
    ) {
        if self.read_only || self.live_mode {
            if self.allow_drag_canvas {
                self.state = DragState::PanningCanvas;
            }
            return;
        }

        let (pinned, local, behavior) = match graph.node(node_id) {
            Some(node) => (
                node.pinned,
                (pos.0 - node.pos.0, pos.1 - node.pos.1),
                node.behavior.clone(),
            ),
            None => return,
        };

        if !pinned {
            graph.bring_to_front(node_id);
        }

        let mut block_drag = pinned;

        // widget rows swallow the press
        if let Some(widget_index) = graph.node(node_id).and_then(|n| n.widget_at(local.1)) {
            self.activate_widget(graph, node_id, widget_index);
            pipeline.mark_dirty(true, false);
            block_drag = true;
        } else if double_click {
            let handled = behavior
                .as_ref()
                .map(|b| {
                    let node = graph.node_mut(node_id).expect("node present");
                    b.on_double_click(node)
                })
                .unwrap_or(false);
            if !handled {
                self.requests.push(UiRequest::NodePanel { node: node_id });
            }
            block_drag = true;
        } else if let Some(behavior) = behavior {
            let node = graph.node_mut(node_id).expect("node present");
            if behavior.on_mouse_down(node, local) {
                block_drag = true;
            }
        }

        if !self.selection.contains(node_id) {
            self.selection.handle_click(graph, node_id, event.modifiers.shift);
        }
        if !block_drag && self.allow_drag_nodes {
            self.state = DragState::DraggingNodes;
        }
        pipeline.mark_dirty(true, false);
    }

    fn begin_connect(
        &mut self,
        graph: &Graph,
        from: SlotRef,
        pointer: (f32, f32),
        pipeline: &mut RenderPipeline,
    ) {
        let Some(node) = graph.node(from.node) else {
            return;
        };
        let (anchor, ty, dir) = if from.is_input {
            (
                node.connection_pos(true, from.slot),
                node.inputs[from.slot].ty.clone(),
                LinkDirection::Left,
            )
        } else {
            (
                node.connection_pos(false, from.slot),
                node.outputs[from.slot].ty.clone(),
                LinkDirection::Right,
            )
        };
        self.overlay.pending_link = Some(PendingLink {
            from: anchor,
            to: pointer,
            from_dir: dir,
        });
        self.state = DragState::Connecting { from, ty };
        pipeline.mark_dirty(true, false);
    }

    fn activate_widget(&mut self, graph: &mut Graph, node_id: NodeId, index: usize) {
        let Some(node) = graph.node_mut(node_id) else {
            return;
        };
        let Some(widget) = node.widgets.get_mut(index) else {
            return;
        };
        match widget.kind {
            WidgetKind::Toggle => {
                let on = widget.value.as_bool().unwrap_or(false);
                widget.value = serde_json::Value::Bool(!on);
            }
            WidgetKind::Button => {
                widget.value = serde_json::Value::Bool(true);
            }
            // value editors are dialog collaborators
            _ => self.requests.push(UiRequest::NodePanel { node: node_id }),
        }
    }

    // ========================================================================
    // Pointer move
    // ========================================================================

    pub fn pointer_move(
        &mut self,
        event: PointerEvent,
        graph: &mut Graph,
        viewport: &mut Viewport,
        pipeline: &mut RenderPipeline,
    ) {
        let delta = (event.pos.0 - self.last_mouse.0, event.pos.1 - self.last_mouse.1);
        self.last_mouse = event.pos;
        let pos = viewport.convert_canvas_to_offset(event.pos);
        let scale = viewport.scale();

        match &mut self.state {
            DragState::Idle => {}
            DragState::SelectionRect { origin } => {
                self.overlay.selection_rect = Some(Rect::new(
                    origin.0,
                    origin.1,
                    pos.0 - origin.0,
                    pos.1 - origin.1,
                ));
                pipeline.mark_dirty(true, false);
            }
            DragState::PanningCanvas => {
                viewport.pan_by(delta.0, delta.1);
                pipeline.mark_dirty(true, true);
            }
            DragState::DraggingNodes => {
                let ids = self.selection.sorted();
                for id in ids {
                    if let Some(node) = graph.node_mut(id) {
                        node.pos.0 += delta.0 / scale;
                        node.pos.1 += delta.1 / scale;
                    }
                }
                pipeline.mark_dirty(true, true);
            }
            DragState::DraggingGroup { group, resizing, nodes } => {
                let group = *group;
                if *resizing {
                    if let Some(g) = graph.group_mut(group) {
                        g.set_size(pos.0 - g.bounding.x, pos.1 - g.bounding.y);
                    }
                } else {
                    let dx = delta.0 / scale;
                    let dy = delta.1 / scale;
                    let nodes = nodes.clone();
                    if let Some(g) = graph.group_mut(group) {
                        g.move_by(dx, dy);
                    }
                    for id in nodes {
                        if let Some(node) = graph.node_mut(id) {
                            node.pos.0 += dx;
                            node.pos.1 += dy;
                        }
                    }
                }
                pipeline.mark_dirty(true, true);
            }
            DragState::Connecting { from, ty } => {
                let from = *from;
                let ty = ty.clone();
                if let Some(pending) = &mut self.overlay.pending_link {
                    pending.to = pos;
                }
                self.overlay.highlight_slot = graph
                    .node_on_pos(pos.0, pos.1, NODE_HIT_MARGIN)
                    .filter(|&id| id != from.node)
                    .and_then(|id| {
                        let node = graph.node(id)?;
                        if from.is_input {
                            let slot = output_slot_at(node, pos.0, pos.1)?;
                            is_valid_connection(&node.outputs[slot].ty, &ty).then_some(SlotRef {
                                node: id,
                                slot,
                                is_input: false,
                            })
                        } else {
                            let slot = input_slot_at(node, pos.0, pos.1)?;
                            is_valid_connection(&ty, &node.inputs[slot].ty).then_some(SlotRef {
                                node: id,
                                slot,
                                is_input: true,
                            })
                        }
                    });
                pipeline.mark_dirty(true, false);
            }
            DragState::ResizingNode { node, corner } => {
                let (node, corner) = (*node, *corner);
                if let Some(n) = graph.node_mut(node) {
                    let min = n.compute_size();
                    match corner {
                        Corner::TopRight | Corner::BottomRight => {
                            n.size.0 = (pos.0 - n.pos.0).max(min.0);
                        }
                        Corner::TopLeft | Corner::BottomLeft => {
                            let right = n.pos.0 + n.size.0;
                            let width = (right - pos.0).max(min.0);
                            n.pos.0 = right - width;
                            n.size.0 = width;
                        }
                    }
                    match corner {
                        Corner::BottomLeft | Corner::BottomRight => {
                            n.size.1 = (pos.1 - n.pos.1).max(min.1);
                        }
                        Corner::TopLeft | Corner::TopRight => {
                            let bottom = n.pos.1 + n.size.1;
                            let height = (bottom - pos.1).max(min.1);
                            n.pos.1 = bottom - height;
                            n.size.1 = height;
                        }
                    }
                }
                pipeline.mark_dirty(true, true);
            }
        }
    }

    // ========================================================================
    // Pointer up
    // ========================================================================

    pub fn pointer_up(
        &mut self,
        event: PointerEvent,
        graph: &mut Graph,
        viewport: &Viewport,
        pipeline: &mut RenderPipeline,
    ) {
        if !self.pointer_is_down {
            return;
        }
        self.pointer_is_down = false;

        let pos = viewport.convert_canvas_to_offset(event.pos);
        let moved = self
            .pointer_down_screen
            .map_or(f32::MAX, |down| distance(down, event.pos));
        let held_ms = event.time_ms - self.pointer_down_at;
        let is_click = moved <= CLICK_DISTANCE && held_ms < CLICK_TIME_MS;
        self.pointer_down_screen = None;

        let state = std::mem::take(&mut self.state);
        match state {
            DragState::Idle => {}
            DragState::SelectionRect { .. } => {
                self.finish_selection_rect(event, pos, graph, pipeline);
            }
            DragState::PanningCanvas => {
                if is_click && graph.node_on_pos(pos.0, pos.1, NODE_HIT_MARGIN).is_none() {
                    self.selection.clear(graph);
                }
                pipeline.mark_dirty(true, false);
            }
            DragState::DraggingNodes => {
                self.finish_node_drag(event, pos, is_click, graph, pipeline);
            }
            DragState::DraggingGroup { group, .. } => {
                if let Some(g) = graph.group_mut(group) {
                    g.round_position();
                }
                pipeline.mark_dirty(true, true);
            }
            DragState::Connecting { from, ty } => {
                self.finish_connect(event, pos, from, ty, graph, pipeline);
            }
            DragState::ResizingNode { .. } => {
                pipeline.mark_dirty(true, true);
            }
        }
    }

    fn finish_selection_rect(
        &mut self,
        event: PointerEvent,
        pos: (f32, f32),
        graph: &mut Graph,
        pipeline: &mut RenderPipeline,
    ) {
        let rect = self
            .overlay
            .selection_rect
            .take()
            .map(|r| r.normalized())
            .unwrap_or_default();
        let node_under = graph.node_on_pos(pos.0, pos.1, NODE_HIT_MARGIN);
        let additive = event.modifiers.shift;

        if node_under.is_none() || (rect.width > SELECTION_RECT_MIN && rect.height > SELECTION_RECT_MIN)
        {
            let ids: Vec<NodeId> = graph
                .nodes()
                .filter(|n| n.bounding().overlaps(&rect))
                .map(|n| n.id)
                .collect();
            if !ids.is_empty() {
                self.selection.extend(graph, ids, additive);
            }
        } else if let Some(id) = node_under {
            // degenerate rectangle: plain click selection
            self.selection
                .handle_click(graph, id, additive || event.modifiers.ctrl);
        }
        pipeline.mark_dirty(true, false);
    }

    fn finish_node_drag(
        &mut self,
        _event: PointerEvent,
        pos: (f32, f32),
        is_click: bool,
        graph: &mut Graph,
        pipeline: &mut RenderPipeline,
    ) {
        if is_click {
            if let Some(id) = graph.node_on_pos(pos.0, pos.1, NODE_HIT_MARGIN) {
                let (collapse, close) = graph
                    .node(id)
                    .map(|n| {
                        (
                            n.is_over_collapse_box(pos.0, pos.1),
                            n.is_over_close_box(pos.0, pos.1),
                        )
                    })
                    .unwrap_or((false, false));
                if collapse {
                    if let Some(node) = graph.node_mut(id) {
                        node.collapse();
                    }
                } else if close {
                    graph.remove_node(id);
                    self.selection.prune(graph);
                }
            }
            pipeline.mark_dirty(true, true);
            return;
        }

        // positions are integer-rounded on release; grid alignment after
        let align = self.align_to_grid || graph.config.align_to_grid;
        for id in self.selection.sorted() {
            if let Some(node) = graph.node_mut(id) {
                node.pos.0 = node.pos.0.round();
                node.pos.1 = node.pos.1.round();
                if align {
                    node.align_to_grid();
                }
            }
        }
        pipeline.mark_dirty(true, true);
    }

    fn finish_connect(
        &mut self,
        event: PointerEvent,
        pos: (f32, f32),
        from: SlotRef,
        ty: String,
        graph: &mut Graph,
        pipeline: &mut RenderPipeline,
    ) {
        self.overlay.pending_link = None;
        self.overlay.highlight_slot = None;

        let target = graph
            .node_on_pos(pos.0, pos.1, NODE_HIT_MARGIN)
            .filter(|&id| id != from.node);
        match target {
            Some(target_id) => {
                let node = graph.node(target_id).expect("hit node present");
                if from.is_input {
                    // released over a node while dragging from an input
                    let slot = output_slot_at(node, pos.0, pos.1)
                        .or_else(|| find_compatible_output(node, &ty));
                    if let Some(slot) = slot {
                        graph.connect(target_id, slot, from.node, from.slot);
                    }
                } else {
                    let slot = input_slot_at(node, pos.0, pos.1)
                        .or_else(|| find_compatible_input(node, &ty));
                    if let Some(slot) = slot {
                        graph.connect(from.node, from.slot, target_id, slot);
                    }
                }
            }
            None => {
                if event.modifiers.shift && self.allow_searchbox {
                    self.requests.push(UiRequest::SearchBox {
                        pos,
                        type_filter: Some(ty),
                        from: Some(from),
                    });
                } else {
                    self.requests.push(UiRequest::QuickConnectMenu { pos, from });
                }
            }
        }
        pipeline.mark_dirty(true, true);
    }

    // ========================================================================
    // Wheel and keyboard
    // ========================================================================

    /// Wheel zoom. Positive `delta` zooms in, pivoting on the cursor.
    pub fn wheel(
        &mut self,
        delta: f32,
        pos: (f32, f32),
        viewport: &mut Viewport,
        pipeline: &mut RenderPipeline,
    ) {
        if !self.allow_drag_canvas || delta == 0.0 {
            return;
        }
        let factor = if delta > 0.0 {
            WHEEL_ZOOM_STEP
        } else {
            1.0 / WHEEL_ZOOM_STEP
        };
        viewport.change_scale_delta(factor, Some(pos));
        pipeline.mark_dirty(true, true);
    }

    pub fn key_down(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        graph: &mut Graph,
        pipeline: &mut RenderPipeline,
    ) {
        match key {
            Key::Delete | Key::Backspace => {
                if !self.read_only {
                    self.delete_selected(graph, pipeline);
                }
            }
            Key::Escape => {
                self.cancel_gesture(pipeline);
                self.requests.push(UiRequest::ClosePanels);
            }
            Key::A if modifiers.ctrl => {
                self.selection.select_all(graph);
                pipeline.mark_dirty(true, false);
            }
            Key::Space => self.space_held = true,
            Key::A => {}
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if key == Key::Space {
            self.space_held = false;
        }
    }

    /// Abort any active gesture, clearing all transient state.
    pub fn cancel_gesture(&mut self, pipeline: &mut RenderPipeline) {
        self.state = DragState::Idle;
        self.overlay = OverlayState::default();
        self.pointer_is_down = false;
        self.pointer_down_screen = None;
        pipeline.mark_dirty(true, false);
    }

    /// Delete the current selection. A deleted node with compatible first
    /// input and first output is bridged, so removing a pass-through node
    /// keeps the chain connected.
    pub fn delete_selected(&mut self, graph: &mut Graph, pipeline: &mut RenderPipeline) {
        for id in self.selection.sorted() {
            let Some(node) = graph.node(id) else {
                continue;
            };
            if node.pinned {
                continue;
            }

            let bridge = match (node.inputs.first(), node.outputs.first()) {
                (Some(input), Some(output))
                    if is_valid_connection(&input.ty, &output.ty) =>
                {
                    let incoming = input.link.and_then(|l| graph.link(l)).cloned();
                    let outgoing = output
                        .links
                        .first()
                        .and_then(|l| graph.link(*l))
                        .cloned();
                    incoming.zip(outgoing)
                }
                _ => None,
            };
            if let Some((incoming, outgoing)) = bridge {
                graph.connect(
                    incoming.origin_id,
                    incoming.origin_slot,
                    outgoing.target_id,
                    outgoing.target_slot,
                );
            }
            graph.remove_node(id);
        }
        self.selection.clear(graph);
        pipeline.mark_dirty(true, true);
    }
}
