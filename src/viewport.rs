//! Pan/zoom transform between screen (canvas) space and graph space.
//!
//! Screen and graph space are related by `screen = (graph + offset) * scale`.
//! The viewport also derives the graph-space rectangle currently visible,
//! which the render pipeline uses to cull nodes, links and groups.

use crate::geometry::Rect;

/// Default zoom clamp range.
pub const MIN_SCALE_DEFAULT: f32 = 0.1;
pub const MAX_SCALE_DEFAULT: f32 = 10.0;

/// Pan/zoom state of one canvas attached to a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// Graph-space translation applied before scaling.
    pub offset: (f32, f32),
    scale: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Size of the canvas element in screen pixels.
    canvas_size: (f32, f32),
    visible_area: Rect,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewport {
    pub fn new() -> Self {
        let mut viewport = Self {
            offset: (0.0, 0.0),
            scale: 1.0,
            min_scale: MIN_SCALE_DEFAULT,
            max_scale: MAX_SCALE_DEFAULT,
            canvas_size: (1024.0, 768.0),
            visible_area: Rect::default(),
        };
        viewport.compute_visible_area(None);
        viewport
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn canvas_size(&self) -> (f32, f32) {
        self.canvas_size
    }

    /// Report the canvas element size (screen pixels). Recomputes the
    /// visible area.
    pub fn set_canvas_size(&mut self, width: f32, height: f32) {
        self.canvas_size = (width, height);
        self.compute_visible_area(None);
    }

    /// Graph-space rectangle currently on screen, as last computed.
    pub fn visible_area(&self) -> Rect {
        self.visible_area
    }

    /// Screen point to graph point.
    pub fn convert_canvas_to_offset(&self, pos: (f32, f32)) -> (f32, f32) {
        (
            pos.0 / self.scale - self.offset.0,
            pos.1 / self.scale - self.offset.1,
        )
    }

    /// Graph point to screen point.
    pub fn convert_offset_to_canvas(&self, pos: (f32, f32)) -> (f32, f32) {
        (
            (pos.0 + self.offset.0) * self.scale,
            (pos.1 + self.offset.1) * self.scale,
        )
    }

    /// Pan by a screen-space delta (pointer movement).
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset.0 += dx / self.scale;
        self.offset.1 += dy / self.scale;
        self.compute_visible_area(None);
    }

    /// Set the absolute scale, keeping the graph point under
    /// `pivot` (screen coordinates) visually fixed. Values outside the
    /// clamp range are clamped, not rejected; a missing pivot zooms on
    /// the canvas center.
    pub fn change_scale(&mut self, value: f32, pivot: Option<(f32, f32)>) {
        let value = value.clamp(self.min_scale, self.max_scale);
        if value == self.scale {
            return;
        }

        let pivot = pivot.unwrap_or((self.canvas_size.0 * 0.5, self.canvas_size.1 * 0.5));
        let before = self.convert_canvas_to_offset(pivot);
        self.scale = value;
        // snap near-1 scales to exactly 1 so the identity transform is exact
        if (self.scale - 1.0).abs() < 0.01 {
            self.scale = 1.0;
        }
        let after = self.convert_canvas_to_offset(pivot);

        self.offset.0 += after.0 - before.0;
        self.offset.1 += after.1 - before.1;
        self.compute_visible_area(None);
    }

    /// Multiply the current scale (wheel zoom steps).
    pub fn change_scale_delta(&mut self, factor: f32, pivot: Option<(f32, f32)>) {
        self.change_scale(self.scale * factor, pivot);
    }

    /// Recompute the graph-space visible rectangle. `viewport_rect`
    /// restricts the computation to a screen-space sub-rectangle of the
    /// canvas (split-view hosts); `None` uses the whole canvas.
    pub fn compute_visible_area(&mut self, viewport_rect: Option<Rect>) -> Rect {
        let (mut width, mut height) = self.canvas_size;
        let mut start_x = -self.offset.0;
        let mut start_y = -self.offset.1;
        if let Some(rect) = viewport_rect {
            start_x += rect.x / self.scale;
            start_y += rect.y / self.scale;
            width = rect.width;
            height = rect.height;
        }
        self.visible_area = Rect::new(start_x, start_y, width / self.scale, height / self.scale);
        self.visible_area
    }

    /// Center the view on a graph-space rectangle (used by
    /// center-on-node tooling).
    pub fn center_on(&mut self, rect: Rect) {
        self.offset.0 = -rect.x - rect.width * 0.5 + (self.canvas_size.0 * 0.5) / self.scale;
        self.offset.1 = -rect.y - rect.height * 0.5 + (self.canvas_size.1 * 0.5) / self.scale;
        self.compute_visible_area(None);
    }

    /// Back to identity: scale 1, no offset.
    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.offset = (0.0, 0.0);
        self.compute_visible_area(None);
    }
}
