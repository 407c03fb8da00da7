//! Nodes: typed units with input/output slots placed on the graph.
//!
//! A node is pure data plus an optional [`NodeBehavior`] capability object.
//! Geometry (slot anchor positions, bounding boxes, resize corners) lives
//! here so the hit-testing and render layers share one source of truth.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use slint::Color;

use crate::geometry::{is_inside_rectangle, Rect};
use crate::link::LinkId;

/// Unique identifier of a node within one graph. `0` marks a node that has
/// not been added to a graph yet.
pub type NodeId = u64;

/// Height of the title bar drawn *above* `pos.1`.
pub const NODE_TITLE_HEIGHT: f32 = 30.0;
/// Vertical pitch of one slot row.
pub const NODE_SLOT_HEIGHT: f32 = 20.0;
/// Default node width.
pub const NODE_WIDTH: f32 = 140.0;
/// Smallest width a resize gesture may produce.
pub const NODE_MIN_WIDTH: f32 = 50.0;
/// Width of the single-row form used for collapsed nodes.
pub const NODE_COLLAPSED_WIDTH: f32 = 80.0;
/// Height of one widget row.
pub const WIDGET_HEIGHT: f32 = 20.0;
/// Cell size used by align-to-grid snapping.
pub const CANVAS_GRID_SIZE: f32 = 10.0;
/// Side length of the square resize hot zones in the node corners.
pub const RESIZE_CORNER_SIZE: f32 = 10.0;

/// Controls a node's participation in the scheduler's step loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMode {
    /// Stepped on every pass (the only mode the step loop executes).
    #[default]
    Always,
    /// Never stepped.
    Never,
    /// Skipped by the scheduler and rendered dimmed; data passes through.
    Bypass,
    /// Stepped only when an external trigger fires (outside this core).
    OnTrigger,
}

/// An input slot. Holds at most one incoming link.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSlot {
    pub name: String,
    pub ty: String,
    pub link: Option<LinkId>,
}

impl InputSlot {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            link: None,
        }
    }
}

/// An output slot. Fans out to any number of links.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputSlot {
    pub name: String,
    pub ty: String,
    pub links: Vec<LinkId>,
}

impl OutputSlot {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            links: Vec::new(),
        }
    }
}

/// Interactive sub-control drawn inside a node body.
#[derive(Debug, Clone)]
pub struct Widget {
    pub name: String,
    pub kind: WidgetKind,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetKind {
    Button,
    Toggle,
    Slider { min: f64, max: f64 },
    Number { min: f64, max: f64, step: f64 },
    Combo { options: Vec<String> },
    Text,
}

impl Widget {
    pub fn new(name: impl Into<String>, kind: WidgetKind, value: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
        }
    }
}

/// Which corner of a node a resize gesture grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Timing and control state handed to a node's step function.
///
/// Step callbacks cannot reach back into the graph (it is mutably borrowed
/// for the node being stepped), so loop control is requested through the
/// context and honored between nodes.
#[derive(Debug, Clone, Default)]
pub struct StepContext {
    /// Wall-clock seconds since `start()`.
    pub global_time: f64,
    /// Fixed-step accumulator advanced once per pass.
    pub fixed_time: f64,
    /// Seconds elapsed since the previous step pass.
    pub elapsed_time: f64,
    /// Number of completed step passes.
    pub iteration: u64,
    stop_requested: bool,
}

impl StepContext {
    /// Ask the scheduler to stop after the current node finishes.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }
}

/// Optional per-type capabilities of a node.
///
/// Every method has a default no-op implementation; a type implements only
/// what it needs and callers probe capabilities (`has_step`) instead of
/// assuming a universal base method.
pub trait NodeBehavior {
    /// Whether this behavior participates in the step loop. Nodes whose
    /// behavior returns `false` are excluded from the executable cache and
    /// never stepped.
    fn has_step(&self) -> bool {
        false
    }

    /// One execution step. Returning `Err` raises a step fault: guarded
    /// runs record it and stop the loop, unguarded runs surface it to the
    /// caller.
    fn step(&self, _node: &mut Node, _ctx: &mut StepContext) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Called after the node is added to a graph.
    fn on_added(&self, _node: &mut Node) {}

    /// Called before the node leaves a graph.
    fn on_removed(&self, _node: &mut Node) {}

    /// Pointer-down inside the node body, in node-local coordinates.
    /// Return `true` to capture the event and suppress dragging.
    fn on_mouse_down(&self, _node: &mut Node, _local: (f32, f32)) -> bool {
        false
    }

    /// Double-click on the node body. Return `true` to suppress the
    /// default panel request.
    fn on_double_click(&self, _node: &mut Node) -> bool {
        false
    }

    /// A link on this node was created or removed.
    fn on_connections_change(&self, _node: &mut Node) {}
}

/// A typed unit placed on the graph.
///
/// `pos` is the top-left corner of the node *body*; the title bar occupies
/// the `NODE_TITLE_HEIGHT` band above it.
#[derive(Clone)]
pub struct Node {
    pub id: NodeId,
    pub type_name: String,
    pub title: String,
    pub pos: (f32, f32),
    pub size: (f32, f32),
    pub inputs: Vec<InputSlot>,
    pub outputs: Vec<OutputSlot>,
    pub mode: NodeMode,
    /// Index in the computed execution sequence; doubles as the render
    /// z-order tie-break.
    pub order: usize,
    /// Execution-order tie-break; lower priorities run first.
    pub priority: i32,
    pub collapsed: bool,
    pub pinned: bool,
    pub selected: bool,
    pub resizable: bool,
    /// Set on placeholder nodes substituted for unknown types at load.
    pub has_errors: bool,
    pub properties: serde_json::Map<String, Value>,
    pub widgets: Vec<Widget>,
    pub color: Option<Color>,
    pub bgcolor: Option<Color>,
    pub behavior: Option<Rc<dyn NodeBehavior>>,
    /// Original serialized payload, retained verbatim on placeholder nodes
    /// so saving an unloadable graph does not lose data.
    pub stored: Option<Value>,
}

impl Node {
    pub fn new(type_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            type_name: type_name.into(),
            title: title.into(),
            pos: (0.0, 0.0),
            size: (NODE_WIDTH, 60.0),
            inputs: Vec::new(),
            outputs: Vec::new(),
            mode: NodeMode::Always,
            order: 0,
            priority: 0,
            collapsed: false,
            pinned: false,
            selected: false,
            resizable: true,
            has_errors: false,
            properties: serde_json::Map::new(),
            widgets: Vec::new(),
            color: None,
            bgcolor: None,
            behavior: None,
            stored: None,
        }
    }

    pub fn add_input(&mut self, name: impl Into<String>, ty: impl Into<String>) -> usize {
        self.inputs.push(InputSlot::new(name, ty));
        self.inputs.len() - 1
    }

    pub fn add_output(&mut self, name: impl Into<String>, ty: impl Into<String>) -> usize {
        self.outputs.push(OutputSlot::new(name, ty));
        self.outputs.len() - 1
    }

    /// Whether this node's behavior exposes a step function.
    pub fn has_step(&self) -> bool {
        self.behavior.as_ref().is_some_and(|b| b.has_step())
    }

    /// Width the node occupies on screen, accounting for the collapsed
    /// single-row form.
    pub fn display_width(&self) -> f32 {
        if self.collapsed {
            NODE_COLLAPSED_WIDTH
        } else {
            self.size.0
        }
    }

    /// Bounding box including the title bar, in graph space.
    pub fn bounding(&self) -> Rect {
        if self.collapsed {
            Rect::new(
                self.pos.0,
                self.pos.1 - NODE_TITLE_HEIGHT,
                NODE_COLLAPSED_WIDTH,
                NODE_TITLE_HEIGHT,
            )
        } else {
            Rect::new(
                self.pos.0,
                self.pos.1 - NODE_TITLE_HEIGHT,
                self.size.0,
                self.size.1 + NODE_TITLE_HEIGHT,
            )
        }
    }

    pub fn is_point_inside(&self, x: f32, y: f32, margin: f32) -> bool {
        self.bounding().expanded(margin).contains(x, y)
    }

    /// Graph-space anchor of a slot's connection point.
    ///
    /// Collapsed nodes expose a single merged anchor per side, centered on
    /// the title row.
    pub fn connection_pos(&self, is_input: bool, slot: usize) -> (f32, f32) {
        if self.collapsed {
            let y = self.pos.1 - NODE_TITLE_HEIGHT * 0.5;
            return if is_input {
                (self.pos.0, y)
            } else {
                (self.pos.0 + NODE_COLLAPSED_WIDTH, y)
            };
        }
        let offset = NODE_SLOT_HEIGHT * 0.5;
        let y = self.pos.1 + (slot as f32 + 0.7) * NODE_SLOT_HEIGHT;
        if is_input {
            (self.pos.0 + offset, y)
        } else {
            (self.pos.0 + self.size.0 + 1.0 - offset, y)
        }
    }

    /// Which resize corner (if any) the point falls into. Collapsed and
    /// non-resizable nodes have none.
    pub fn resize_corner_at(&self, x: f32, y: f32) -> Option<Corner> {
        if !self.resizable || self.collapsed {
            return None;
        }
        let (nx, ny) = self.pos;
        let (w, h) = self.size;
        let s = RESIZE_CORNER_SIZE;
        if is_inside_rectangle(x, y, nx + w - s, ny + h - s, s, s) {
            Some(Corner::BottomRight)
        } else if is_inside_rectangle(x, y, nx, ny + h - s, s, s) {
            Some(Corner::BottomLeft)
        } else if is_inside_rectangle(x, y, nx + w - s, ny, s, s) {
            Some(Corner::TopRight)
        } else if is_inside_rectangle(x, y, nx, ny, s, s) {
            Some(Corner::TopLeft)
        } else {
            None
        }
    }

    /// Whether the point is over the collapse toggle box in the title bar.
    pub fn is_over_collapse_box(&self, x: f32, y: f32) -> bool {
        let th = NODE_TITLE_HEIGHT;
        is_inside_rectangle(x, y, self.pos.0, self.pos.1 - th, th, th)
    }

    /// Whether the point is over the close button at the right end of the
    /// title bar. Collapsed nodes have no close button.
    pub fn is_over_close_box(&self, x: f32, y: f32) -> bool {
        if self.collapsed {
            return false;
        }
        let th = NODE_TITLE_HEIGHT;
        is_inside_rectangle(x, y, self.pos.0 + self.size.0 - th, self.pos.1 - th, th, th)
    }

    /// Smallest size that still fits every slot row and widget.
    pub fn compute_size(&self) -> (f32, f32) {
        let rows = self.inputs.len().max(self.outputs.len()).max(1) as f32;
        let mut height = rows * NODE_SLOT_HEIGHT + 6.0;
        if !self.widgets.is_empty() {
            height += self.widgets.len() as f32 * (WIDGET_HEIGHT + 4.0) + 4.0;
        }
        let title_width = self.title.len() as f32 * 7.5 + NODE_TITLE_HEIGHT;
        (title_width.max(NODE_WIDTH), height)
    }

    /// Vertical start of the widget block, below the slot rows.
    pub fn widgets_start_y(&self) -> f32 {
        self.inputs.len().max(self.outputs.len()) as f32 * NODE_SLOT_HEIGHT + 6.0
    }

    /// Index of the widget row at a node-local y position.
    pub fn widget_at(&self, local_y: f32) -> Option<usize> {
        if self.collapsed || self.widgets.is_empty() {
            return None;
        }
        let start = self.widgets_start_y();
        if local_y < start {
            return None;
        }
        let idx = ((local_y - start) / (WIDGET_HEIGHT + 4.0)) as usize;
        (idx < self.widgets.len()).then_some(idx)
    }

    /// Snap the position to the canvas grid.
    pub fn align_to_grid(&mut self) {
        self.pos.0 = (self.pos.0 / CANVAS_GRID_SIZE).round() * CANVAS_GRID_SIZE;
        self.pos.1 = (self.pos.1 / CANVAS_GRID_SIZE).round() * CANVAS_GRID_SIZE;
    }

    pub fn collapse(&mut self) {
        self.collapsed = !self.collapsed;
    }

    /// A detached copy with cleared links and no id, ready to be added to
    /// a graph (used by alt-drag cloning and paste).
    pub fn duplicate(&self) -> Node {
        let mut copy = self.clone();
        copy.id = 0;
        copy.selected = false;
        for input in &mut copy.inputs {
            input.link = None;
        }
        for output in &mut copy.outputs {
            output.links.clear();
        }
        copy
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("title", &self.title)
            .field("pos", &self.pos)
            .field("size", &self.size)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("mode", &self.mode)
            .field("order", &self.order)
            .finish()
    }
}
