//! Double-buffered render pipeline.
//!
//! Two retained command lists back the canvas: the *background* layer
//! (grid, groups, links) and the *foreground* layer (nodes, widgets,
//! transient overlays). Each has its own dirty flag so static content is
//! not rebuilt every frame; the host strokes whichever lists changed.
//!
//! All draw commands are emitted in screen coordinates — the pipeline
//! applies the viewport transform itself so the host needs no transform
//! state. Zoomed-out frames swap circles for plain rectangles and drop
//! text to bound per-frame cost.

use std::collections::HashMap;
use std::rc::Rc;

use slint::{Color, Model, SharedString, VecModel};

use crate::geometry::Rect;
use crate::graph::Graph;
use crate::grid::grid_paths;
use crate::link::LinkId;
use crate::node::{Node, NodeId, NodeMode, NODE_TITLE_HEIGHT, RESIZE_CORNER_SIZE, WIDGET_HEIGHT};
use crate::path::{generate_link_path, link_center, LinkDirection, LinkRenderMode};
use crate::viewport::Viewport;

/// One retained drawing primitive, in screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// SVG-style path commands, stroked (or filled) by the host.
    Path {
        commands: SharedString,
        color: Color,
        width: f32,
        fill: bool,
    },
    Rect {
        rect: Rect,
        color: Color,
        fill: bool,
        radius: f32,
    },
    Circle {
        center: (f32, f32),
        radius: f32,
        color: Color,
        fill: bool,
    },
    Text {
        pos: (f32, f32),
        text: SharedString,
        color: Color,
        size: f32,
    },
}

/// A slot reference used by overlays (connect-gesture highlighting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef {
    pub node: NodeId,
    pub slot: usize,
    pub is_input: bool,
}

/// An in-progress link whose free end follows the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingLink {
    /// Graph-space anchor of the fixed end.
    pub from: (f32, f32),
    /// Graph-space position of the free end (the pointer).
    pub to: (f32, f32),
    pub from_dir: LinkDirection,
}

/// Transient gesture state the foreground layer renders on top of nodes.
/// Owned by the input controller, read here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayState {
    /// Graph-space selection rectangle, possibly with negative extents.
    pub selection_rect: Option<Rect>,
    pub pending_link: Option<PendingLink>,
    /// Compatible slot under the pointer while connecting.
    pub highlight_slot: Option<SlotRef>,
}

/// Colors and limits for one canvas.
#[derive(Debug, Clone)]
pub struct RenderStyle {
    pub background: Color,
    pub grid_minor: Color,
    pub grid_major: Color,
    pub grid_spacing: f32,
    pub grid_major_every: i64,
    pub node_body: Color,
    pub node_title: Color,
    pub node_text: Color,
    pub selected_outline: Color,
    pub error_outline: Color,
    pub bypass_tint: Color,
    pub slot_color: Color,
    pub slot_highlight: Color,
    pub widget_bg: Color,
    pub link_default: Color,
    pub link_colors: HashMap<String, Color>,
    pub selection_fill: Color,
    pub selection_stroke: Color,
    /// Below this zoom, text is dropped and slots become rectangles.
    pub low_detail_threshold: f32,
    pub link_render_mode: LinkRenderMode,
    /// Minimum spline control-point offset.
    pub link_bezier_offset: f32,
    pub text_size: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: Color::from_rgb_u8(0x20, 0x20, 0x20),
            grid_minor: Color::from_rgb_u8(0x28, 0x28, 0x28),
            grid_major: Color::from_rgb_u8(0x30, 0x30, 0x30),
            grid_spacing: 24.0,
            grid_major_every: 5,
            node_body: Color::from_rgb_u8(0x35, 0x35, 0x35),
            node_title: Color::from_rgb_u8(0x2A, 0x2A, 0x2A),
            node_text: Color::from_rgb_u8(0xDD, 0xDD, 0xDD),
            selected_outline: Color::from_rgb_u8(0xFF, 0xFF, 0xFF),
            error_outline: Color::from_rgb_u8(0xE5, 0x3E, 0x3E),
            bypass_tint: Color::from_argb_u8(0x60, 0x9B, 0x40, 0x9B),
            slot_color: Color::from_rgb_u8(0x9A, 0x9A, 0x9A),
            slot_highlight: Color::from_rgb_u8(0xFF, 0xCF, 0x4D),
            widget_bg: Color::from_rgb_u8(0x2E, 0x2E, 0x2E),
            link_default: Color::from_rgb_u8(0x9A, 0x9A, 0xC8),
            link_colors: HashMap::new(),
            selection_fill: Color::from_argb_u8(0x20, 0x4D, 0x9E, 0xFF),
            selection_stroke: Color::from_rgb_u8(0x4D, 0x9E, 0xFF),
            low_detail_threshold: 0.6,
            link_render_mode: LinkRenderMode::Spline,
            link_bezier_offset: 50.0,
            text_size: 13.0,
        }
    }
}

impl RenderStyle {
    /// Link stroke color for a slot type.
    pub fn link_color(&self, ty: &str) -> Color {
        self.link_colors
            .get(ty)
            .copied()
            .unwrap_or(self.link_default)
    }
}

/// Auto-sync of a command list into a Slint `VecModel`.
trait CommandSyncer {
    fn sync(&self, commands: &[DrawCommand]);
}

struct ModelSyncer<P, F> {
    model: Rc<VecModel<P>>,
    build: F,
}

impl<P, F> CommandSyncer for ModelSyncer<P, F>
where
    P: Clone + 'static,
    F: Fn(&DrawCommand) -> P,
{
    fn sync(&self, commands: &[DrawCommand]) {
        for (i, command) in commands.iter().enumerate() {
            let row = (self.build)(command);
            if i < self.model.row_count() {
                self.model.set_row_data(i, row);
            } else {
                self.model.push(row);
            }
        }
        while self.model.row_count() > commands.len() {
            self.model.remove(self.model.row_count() - 1);
        }
    }
}

/// The double-buffered pipeline for one canvas.
pub struct RenderPipeline {
    pub style: RenderStyle,
    dirty_canvas: bool,
    dirty_bgcanvas: bool,
    background: Vec<DrawCommand>,
    foreground: Vec<DrawCommand>,
    /// Ids of nodes inside the visible area at the last foreground pass,
    /// in draw order (selected nodes last).
    visible_nodes: Vec<NodeId>,
    /// Graph-space link midpoints from the last background pass, used by
    /// the link-menu hot zone.
    link_centers: HashMap<LinkId, (f32, f32)>,
    background_syncer: Option<Box<dyn CommandSyncer>>,
    foreground_syncer: Option<Box<dyn CommandSyncer>>,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self {
            style: RenderStyle::default(),
            dirty_canvas: true,
            dirty_bgcanvas: true,
            background: Vec::new(),
            foreground: Vec::new(),
            visible_nodes: Vec::new(),
            link_centers: HashMap::new(),
            background_syncer: None,
            foreground_syncer: None,
        }
    }

    /// Mark layers for rebuild at the next frame.
    pub fn mark_dirty(&mut self, foreground: bool, background: bool) {
        self.dirty_canvas |= foreground;
        self.dirty_bgcanvas |= background;
    }

    pub fn is_foreground_dirty(&self) -> bool {
        self.dirty_canvas
    }

    pub fn is_background_dirty(&self) -> bool {
        self.dirty_bgcanvas
    }

    pub fn background_commands(&self) -> &[DrawCommand] {
        &self.background
    }

    pub fn foreground_commands(&self) -> &[DrawCommand] {
        &self.foreground
    }

    /// Culled node set from the last foreground pass, in draw order.
    pub fn visible_nodes(&self) -> &[NodeId] {
        &self.visible_nodes
    }

    /// Graph-space link midpoints from the last background pass.
    pub fn link_centers(&self) -> &HashMap<LinkId, (f32, f32)> {
        &self.link_centers
    }

    /// Bind a Slint model that mirrors the background layer; resynced on
    /// every rebuild.
    pub fn bind_background_model<P, F>(&mut self, model: Rc<VecModel<P>>, build: F)
    where
        P: Clone + 'static,
        F: Fn(&DrawCommand) -> P + 'static,
    {
        self.background_syncer = Some(Box::new(ModelSyncer { model, build }));
    }

    /// Bind a Slint model that mirrors the foreground layer.
    pub fn bind_foreground_model<P, F>(&mut self, model: Rc<VecModel<P>>, build: F)
    where
        P: Clone + 'static,
        F: Fn(&DrawCommand) -> P + 'static,
    {
        self.foreground_syncer = Some(Box::new(ModelSyncer { model, build }));
    }

    /// Rebuild whichever layers are dirty. Returns whether anything was
    /// redrawn.
    pub fn draw_frame(&mut self, graph: &Graph, viewport: &Viewport, overlay: &OverlayState) -> bool {
        let mut redrew = false;
        if self.dirty_bgcanvas {
            self.rebuild_background(graph, viewport);
            self.dirty_bgcanvas = false;
            if let Some(syncer) = &self.background_syncer {
                syncer.sync(&self.background);
            }
            redrew = true;
        }
        if self.dirty_canvas {
            self.rebuild_foreground(graph, viewport, overlay);
            self.dirty_canvas = false;
            if let Some(syncer) = &self.foreground_syncer {
                syncer.sync(&self.foreground);
            }
            redrew = true;
        }
        redrew
    }

    // ========================================================================
    // Background: grid, groups, links
    // ========================================================================

    fn rebuild_background(&mut self, graph: &Graph, viewport: &Viewport) {
        let mut commands = Vec::new();
        let scale = viewport.scale();
        let (width, height) = viewport.canvas_size();
        let visible = viewport.visible_area();

        let grid = grid_paths(
            width,
            height,
            scale,
            viewport.offset.0 * scale,
            viewport.offset.1 * scale,
            self.style.grid_spacing,
            self.style.grid_major_every,
        );
        for (path, color) in [
            (grid.minor, self.style.grid_minor),
            (grid.major, self.style.grid_major),
        ] {
            if !path.is_empty() {
                commands.push(DrawCommand::Path {
                    commands: path.into(),
                    color,
                    width: 1.0,
                    fill: false,
                });
            }
        }

        for group in graph.groups() {
            if !group.bounding.overlaps(&visible) {
                continue;
            }
            let origin = viewport.convert_offset_to_canvas((group.bounding.x, group.bounding.y));
            let rect = Rect::new(
                origin.0,
                origin.1,
                group.bounding.width * scale,
                group.bounding.height * scale,
            );
            let c = group.color;
            commands.push(DrawCommand::Rect {
                rect,
                color: Color::from_argb_u8(0x40, c.red(), c.green(), c.blue()),
                fill: true,
                radius: 4.0 * scale,
            });
            commands.push(DrawCommand::Rect {
                rect,
                color: c,
                fill: false,
                radius: 4.0 * scale,
            });
            if scale >= self.style.low_detail_threshold {
                commands.push(DrawCommand::Text {
                    pos: (origin.0 + 4.0 * scale, origin.1 + 4.0 * scale),
                    text: group.title.as_str().into(),
                    color: c,
                    size: group.font_size * scale,
                });
            }
        }

        self.link_centers.clear();
        for link in graph.links() {
            let (Some(origin), Some(target)) =
                (graph.node(link.origin_id), graph.node(link.target_id))
            else {
                continue;
            };
            let start = origin.connection_pos(false, link.origin_slot);
            let end = target.connection_pos(true, link.target_slot);

            // center cache is kept for every link, culled or not, so the
            // link menu works on links whose middle is off screen too
            let center = link_center(
                start,
                end,
                LinkDirection::Right,
                LinkDirection::Left,
                self.style.link_render_mode,
                1.0,
                self.style.link_bezier_offset,
            );
            self.link_centers.insert(link.id, center);

            let span = Rect::new(
                start.0.min(end.0),
                start.1.min(end.1),
                (end.0 - start.0).abs(),
                (end.1 - start.1).abs(),
            )
            .expanded(self.style.link_bezier_offset);
            if !span.overlaps(&visible) {
                continue;
            }

            let path = generate_link_path(
                viewport.convert_offset_to_canvas(start),
                viewport.convert_offset_to_canvas(end),
                LinkDirection::Right,
                LinkDirection::Left,
                self.style.link_render_mode,
                scale,
                self.style.link_bezier_offset,
            );
            commands.push(DrawCommand::Path {
                commands: path.into(),
                color: self.style.link_color(&link.ty),
                width: (2.0 * scale).max(1.0),
                fill: false,
            });
        }

        self.background = commands;
    }

    // ========================================================================
    // Foreground: nodes, widgets, overlays
    // ========================================================================

    fn rebuild_foreground(&mut self, graph: &Graph, viewport: &Viewport, overlay: &OverlayState) {
        let mut commands = Vec::new();
        let visible = viewport.visible_area();

        // cull, then draw unselected nodes first so selection stays on top
        let mut visible_nodes: Vec<NodeId> = graph
            .nodes()
            .filter(|n| n.bounding().overlaps(&visible))
            .map(|n| n.id)
            .collect();
        visible_nodes.sort_by_key(|id| graph.node(*id).is_some_and(|n| n.selected));

        for &id in &visible_nodes {
            if let Some(node) = graph.node(id) {
                self.draw_node(node, viewport, overlay, &mut commands);
            }
        }
        self.visible_nodes = visible_nodes;

        self.draw_overlays(viewport, overlay, &mut commands);
        self.foreground = commands;
    }

    fn draw_node(
        &self,
        node: &Node,
        viewport: &Viewport,
        overlay: &OverlayState,
        commands: &mut Vec<DrawCommand>,
    ) {
        let scale = viewport.scale();
        let low_detail = scale < self.style.low_detail_threshold;
        let title_color = node.color.unwrap_or(self.style.node_title);
        let body_color = node.bgcolor.unwrap_or(self.style.node_body);
        let width = node.display_width();

        let title_origin =
            viewport.convert_offset_to_canvas((node.pos.0, node.pos.1 - NODE_TITLE_HEIGHT));
        let title_rect = Rect::new(
            title_origin.0,
            title_origin.1,
            width * scale,
            NODE_TITLE_HEIGHT * scale,
        );

        commands.push(DrawCommand::Rect {
            rect: title_rect,
            color: title_color,
            fill: true,
            radius: 4.0 * scale,
        });

        if !node.collapsed {
            let body_origin = viewport.convert_offset_to_canvas(node.pos);
            commands.push(DrawCommand::Rect {
                rect: Rect::new(
                    body_origin.0,
                    body_origin.1,
                    node.size.0 * scale,
                    node.size.1 * scale,
                ),
                color: body_color,
                fill: true,
                radius: 0.0,
            });
            if node.mode == NodeMode::Bypass {
                commands.push(DrawCommand::Rect {
                    rect: Rect::new(
                        body_origin.0,
                        body_origin.1,
                        node.size.0 * scale,
                        node.size.1 * scale,
                    ),
                    color: self.style.bypass_tint,
                    fill: true,
                    radius: 0.0,
                });
            }
        }

        // collapse toggle box; close box only on expanded nodes
        let box_size = 10.0 * scale;
        let box_inset = (NODE_TITLE_HEIGHT * scale - box_size) * 0.5;
        commands.push(DrawCommand::Rect {
            rect: Rect::new(
                title_rect.x + box_inset,
                title_rect.y + box_inset,
                box_size,
                box_size,
            ),
            color: self.style.node_text,
            fill: node.collapsed,
            radius: 2.0 * scale,
        });
        if !node.collapsed {
            commands.push(DrawCommand::Rect {
                rect: Rect::new(
                    title_rect.x + title_rect.width - box_inset - box_size,
                    title_rect.y + box_inset,
                    box_size,
                    box_size,
                ),
                color: self.style.node_text,
                fill: false,
                radius: 2.0 * scale,
            });
        }

        if !low_detail {
            commands.push(DrawCommand::Text {
                pos: (
                    title_rect.x + NODE_TITLE_HEIGHT * scale,
                    title_rect.y + 8.0 * scale,
                ),
                text: node.title.as_str().into(),
                color: self.style.node_text,
                size: self.style.text_size * scale,
            });
        }

        if !node.collapsed {
            self.draw_slots(node, viewport, overlay, commands);
            self.draw_widgets(node, viewport, commands);
        } else {
            // merged anchors on the reduced single-row form
            for (is_input, present) in
                [(true, !node.inputs.is_empty()), (false, !node.outputs.is_empty())]
            {
                if present {
                    let anchor = viewport.convert_offset_to_canvas(node.connection_pos(is_input, 0));
                    self.push_slot_marker(anchor, scale, self.style.slot_color, low_detail, commands);
                }
            }
        }

        if node.selected || node.has_errors {
            let outline = if node.has_errors {
                self.style.error_outline
            } else {
                self.style.selected_outline
            };
            let bounds = node.bounding();
            let origin = viewport.convert_offset_to_canvas((bounds.x, bounds.y));
            commands.push(DrawCommand::Rect {
                rect: Rect::new(
                    origin.0,
                    origin.1,
                    bounds.width * scale,
                    bounds.height * scale,
                )
                .expanded(2.0),
                color: outline,
                fill: false,
                radius: 4.0 * scale,
            });
        }

        if node.selected && node.resizable && !node.collapsed && !low_detail {
            let corner = viewport.convert_offset_to_canvas((
                node.pos.0 + node.size.0 - RESIZE_CORNER_SIZE,
                node.pos.1 + node.size.1 - RESIZE_CORNER_SIZE,
            ));
            commands.push(DrawCommand::Rect {
                rect: Rect::new(
                    corner.0,
                    corner.1,
                    RESIZE_CORNER_SIZE * scale,
                    RESIZE_CORNER_SIZE * scale,
                ),
                color: self.style.node_text,
                fill: false,
                radius: 2.0 * scale,
            });
        }
    }

    fn draw_slots(
        &self,
        node: &Node,
        viewport: &Viewport,
        overlay: &OverlayState,
        commands: &mut Vec<DrawCommand>,
    ) {
        let scale = viewport.scale();
        let low_detail = scale < self.style.low_detail_threshold;
        for (is_input, count) in [(true, node.inputs.len()), (false, node.outputs.len())] {
            for slot in 0..count {
                let highlighted = overlay.highlight_slot
                    == Some(SlotRef {
                        node: node.id,
                        slot,
                        is_input,
                    });
                let color = if highlighted {
                    self.style.slot_highlight
                } else {
                    self.style.slot_color
                };
                let anchor = viewport.convert_offset_to_canvas(node.connection_pos(is_input, slot));
                self.push_slot_marker(anchor, scale, color, low_detail, commands);

                if !low_detail {
                    let name = if is_input {
                        &node.inputs[slot].name
                    } else {
                        &node.outputs[slot].name
                    };
                    if !name.is_empty() {
                        let dx = if is_input { 8.0 } else { -8.0 - name.len() as f32 * 6.0 };
                        commands.push(DrawCommand::Text {
                            pos: (anchor.0 + dx * scale, anchor.1 - 5.0 * scale),
                            text: name.as_str().into(),
                            color: self.style.node_text,
                            size: (self.style.text_size - 2.0) * scale,
                        });
                    }
                }
            }
        }
    }

    /// Slot anchors degrade to squares below the low-detail threshold.
    fn push_slot_marker(
        &self,
        anchor: (f32, f32),
        scale: f32,
        color: Color,
        low_detail: bool,
        commands: &mut Vec<DrawCommand>,
    ) {
        let radius = 4.0 * scale;
        if low_detail {
            commands.push(DrawCommand::Rect {
                rect: Rect::new(anchor.0 - radius, anchor.1 - radius, radius * 2.0, radius * 2.0),
                color,
                fill: true,
                radius: 0.0,
            });
        } else {
            commands.push(DrawCommand::Circle {
                center: anchor,
                radius,
                color,
                fill: true,
            });
        }
    }

    fn draw_widgets(&self, node: &Node, viewport: &Viewport, commands: &mut Vec<DrawCommand>) {
        let scale = viewport.scale();
        if node.widgets.is_empty() || scale < self.style.low_detail_threshold {
            return;
        }
        let start_y = node.widgets_start_y();
        for (index, widget) in node.widgets.iter().enumerate() {
            let local_y = start_y + index as f32 * (WIDGET_HEIGHT + 4.0);
            let origin =
                viewport.convert_offset_to_canvas((node.pos.0 + 6.0, node.pos.1 + local_y));
            commands.push(DrawCommand::Rect {
                rect: Rect::new(
                    origin.0,
                    origin.1,
                    (node.size.0 - 12.0) * scale,
                    WIDGET_HEIGHT * scale,
                ),
                color: self.style.widget_bg,
                fill: true,
                radius: WIDGET_HEIGHT * 0.5 * scale,
            });
            let label = match &widget.value {
                serde_json::Value::Null => widget.name.clone(),
                value => format!("{}: {}", widget.name, value),
            };
            commands.push(DrawCommand::Text {
                pos: (origin.0 + 8.0 * scale, origin.1 + 4.0 * scale),
                text: label.into(),
                color: self.style.node_text,
                size: (self.style.text_size - 2.0) * scale,
            });
        }
    }

    fn draw_overlays(
        &self,
        viewport: &Viewport,
        overlay: &OverlayState,
        commands: &mut Vec<DrawCommand>,
    ) {
        if let Some(rect) = overlay.selection_rect {
            let rect = rect.normalized();
            let origin = viewport.convert_offset_to_canvas((rect.x, rect.y));
            let screen = Rect::new(
                origin.0,
                origin.1,
                rect.width * viewport.scale(),
                rect.height * viewport.scale(),
            );
            commands.push(DrawCommand::Rect {
                rect: screen,
                color: self.style.selection_fill,
                fill: true,
                radius: 0.0,
            });
            commands.push(DrawCommand::Rect {
                rect: screen,
                color: self.style.selection_stroke,
                fill: false,
                radius: 0.0,
            });
        }

        if let Some(pending) = overlay.pending_link {
            let path = generate_link_path(
                viewport.convert_offset_to_canvas(pending.from),
                viewport.convert_offset_to_canvas(pending.to),
                pending.from_dir,
                LinkDirection::Center,
                self.style.link_render_mode,
                viewport.scale(),
                self.style.link_bezier_offset,
            );
            commands.push(DrawCommand::Path {
                commands: path.into(),
                color: self.style.slot_highlight,
                width: (2.0 * viewport.scale()).max(1.0),
                fill: false,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> (Graph, NodeId, NodeId) {
        let mut graph = Graph::new();
        let mut a = Node::new("test/source", "Source");
        a.add_output("out", "number");
        a.pos = (100.0, 100.0);
        let mut b = Node::new("test/sink", "Sink");
        b.add_input("in", "number");
        b.pos = (400.0, 200.0);
        let a = graph.add_node(a).unwrap();
        let b = graph.add_node(b).unwrap();
        graph.connect(a, 0, b, 0).unwrap();
        (graph, a, b)
    }

    fn count_paths(commands: &[DrawCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Path { .. }))
            .count()
    }

    fn count_circles(commands: &[DrawCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Circle { .. }))
            .count()
    }

    // ========================================================================
    // Dirty-flag discipline
    // ========================================================================

    #[test]
    fn test_first_frame_draws_both_layers() {
        let (graph, _, _) = sample_graph();
        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();

        assert!(pipeline.draw_frame(&graph, &viewport, &OverlayState::default()));
        assert!(!pipeline.is_background_dirty());
        assert!(!pipeline.is_foreground_dirty());
    }

    #[test]
    fn test_clean_frame_draws_nothing() {
        let (graph, _, _) = sample_graph();
        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());

        assert!(!pipeline.draw_frame(&graph, &viewport, &OverlayState::default()));
    }

    #[test]
    fn test_mark_dirty_rebuilds_only_that_layer() {
        let (graph, _, _) = sample_graph();
        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());
        let bg_before = pipeline.background_commands().len();

        pipeline.mark_dirty(true, false);
        assert!(pipeline.draw_frame(&graph, &viewport, &OverlayState::default()));
        assert_eq!(pipeline.background_commands().len(), bg_before);
    }

    // ========================================================================
    // Background content
    // ========================================================================

    #[test]
    fn test_background_has_grid_and_link() {
        let (graph, _, _) = sample_graph();
        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());

        // grid minor + grid major + one link
        assert!(count_paths(pipeline.background_commands()) >= 3);
        assert_eq!(pipeline.link_centers().len(), 1);
    }

    #[test]
    fn test_link_center_cached_in_graph_space() {
        let (graph, a, b) = sample_graph();
        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());

        let link_id = graph.node(b).unwrap().inputs[0].link.unwrap();
        let center = pipeline.link_centers()[&link_id];
        let start = graph.node(a).unwrap().connection_pos(false, 0);
        let end = graph.node(b).unwrap().connection_pos(true, 0);
        assert!(center.0 > start.0 && center.0 < end.0);
    }

    #[test]
    fn test_groups_render_into_background() {
        let (mut graph, _, _) = sample_graph();
        let mut group = crate::group::Group::new("Cluster");
        group.bounding = Rect::new(50.0, 50.0, 400.0, 300.0);
        graph.add_group(group);

        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());

        let has_group_title = pipeline.background_commands().iter().any(|c| {
            matches!(c, DrawCommand::Text { text, .. } if text.as_str() == "Cluster")
        });
        assert!(has_group_title);
    }

    // ========================================================================
    // Foreground content and culling
    // ========================================================================

    #[test]
    fn test_culling_excludes_offscreen_nodes() {
        let (mut graph, a, b) = sample_graph();
        graph.node_mut(b).unwrap().pos = (10_000.0, 10_000.0);

        let mut viewport = Viewport::new();
        viewport.set_canvas_size(800.0, 600.0);
        let mut pipeline = RenderPipeline::new();
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());

        assert_eq!(pipeline.visible_nodes(), &[a]);
    }

    #[test]
    fn test_selected_nodes_draw_last() {
        let (mut graph, a, b) = sample_graph();
        graph.node_mut(a).unwrap().selected = true;

        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());

        assert_eq!(pipeline.visible_nodes(), &[b, a]);
    }

    #[test]
    fn test_low_zoom_uses_rect_slots_and_no_text() {
        let (graph, _, _) = sample_graph();
        let mut viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();

        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());
        let circles_full = count_circles(pipeline.foreground_commands());
        assert!(circles_full > 0);
        let text_full = pipeline
            .foreground_commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Text { .. }))
            .count();
        assert!(text_full > 0);

        viewport.change_scale(0.2, Some((0.0, 0.0)));
        pipeline.mark_dirty(true, true);
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());

        assert_eq!(count_circles(pipeline.foreground_commands()), 0);
        let text_low = pipeline
            .foreground_commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Text { .. }))
            .count();
        assert_eq!(text_low, 0);
    }

    #[test]
    fn test_collapsed_node_draws_reduced_form() {
        let (mut graph, a, _) = sample_graph();
        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());
        let full = pipeline.foreground_commands().len();

        graph.node_mut(a).unwrap().collapsed = true;
        pipeline.mark_dirty(true, false);
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());

        assert!(pipeline.foreground_commands().len() < full);
    }

    // ========================================================================
    // Overlays
    // ========================================================================

    #[test]
    fn test_selection_rect_overlay_normalizes() {
        let (graph, _, _) = sample_graph();
        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();
        let overlay = OverlayState {
            selection_rect: Some(Rect::new(200.0, 200.0, -100.0, -50.0)),
            ..Default::default()
        };
        pipeline.draw_frame(&graph, &viewport, &overlay);

        let rect = pipeline.foreground_commands().iter().find_map(|c| match c {
            DrawCommand::Rect { rect, fill: true, color, .. }
                if *color == pipeline.style.selection_fill =>
            {
                Some(*rect)
            }
            _ => None,
        });
        let rect = rect.expect("selection rect drawn");
        assert_eq!((rect.x, rect.y), (100.0, 150.0));
        assert_eq!((rect.width, rect.height), (100.0, 50.0));
    }

    #[test]
    fn test_pending_link_overlay_draws_path() {
        let (graph, _, _) = sample_graph();
        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();
        let overlay = OverlayState {
            pending_link: Some(PendingLink {
                from: (100.0, 100.0),
                to: (300.0, 150.0),
                from_dir: LinkDirection::Right,
            }),
            ..Default::default()
        };
        pipeline.draw_frame(&graph, &viewport, &overlay);
        assert!(count_paths(pipeline.foreground_commands()) >= 1);
    }

    #[test]
    fn test_highlight_slot_changes_marker_color() {
        let (graph, _, b) = sample_graph();
        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();
        let overlay = OverlayState {
            highlight_slot: Some(SlotRef {
                node: b,
                slot: 0,
                is_input: true,
            }),
            ..Default::default()
        };
        pipeline.draw_frame(&graph, &viewport, &overlay);

        let highlight = pipeline.style.slot_highlight;
        let found = pipeline.foreground_commands().iter().any(|c| {
            matches!(c, DrawCommand::Circle { color, .. } if *color == highlight)
        });
        assert!(found);
    }

    // ========================================================================
    // Model sync
    // ========================================================================

    #[test]
    fn test_bound_model_mirrors_foreground() {
        let (graph, _, _) = sample_graph();
        let viewport = Viewport::new();
        let mut pipeline = RenderPipeline::new();

        let model: Rc<VecModel<i32>> = Rc::new(VecModel::default());
        pipeline.bind_foreground_model(model.clone(), |_| 1i32);
        pipeline.draw_frame(&graph, &viewport, &OverlayState::default());

        assert_eq!(model.row_count(), pipeline.foreground_commands().len());
    }
}
