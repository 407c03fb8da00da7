//! Groups: labeled rectangles used to visually cluster nodes.
//!
//! A group never owns nodes. Its membership is recomputed on demand from
//! bounding-box overlap, so nodes dragged into or out of the rectangle are
//! picked up at the next gesture that cares.

use slint::Color;

use crate::geometry::{distance, Rect};
use crate::node::NodeId;

/// Minimum group extents enforced on every resize.
pub const GROUP_MIN_WIDTH: f32 = 140.0;
pub const GROUP_MIN_HEIGHT: f32 = 80.0;
/// Screen-space radius of the corner resize hot zone.
pub const GROUP_RESIZE_RADIUS: f32 = 10.0;

/// A labeled rectangle on the background layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub title: String,
    pub bounding: Rect,
    pub color: Color,
    pub font_size: f32,
}

impl Group {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bounding: Rect::new(10.0, 10.0, GROUP_MIN_WIDTH, GROUP_MIN_HEIGHT),
            color: Color::from_rgb_u8(0xAA, 0xAA, 0xAA),
            font_size: 24.0,
        }
    }

    /// Resize, clamping to the minimum extents.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.bounding.width = width.max(GROUP_MIN_WIDTH);
        self.bounding.height = height.max(GROUP_MIN_HEIGHT);
    }

    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.bounding.x += dx;
        self.bounding.y += dy;
    }

    /// Snap the position to whole graph units (applied on drag release).
    pub fn round_position(&mut self) {
        self.bounding.x = self.bounding.x.round();
        self.bounding.y = self.bounding.y.round();
    }

    pub fn is_point_inside(&self, x: f32, y: f32, margin: f32) -> bool {
        self.bounding.expanded(margin).contains(x, y)
    }

    /// Whether a point grabs the bottom-right resize handle. The hot zone
    /// is a fixed screen-space radius, hence the scale parameter.
    pub fn is_over_resize_corner(&self, x: f32, y: f32, scale: f32) -> bool {
        let corner = (
            self.bounding.x + self.bounding.width,
            self.bounding.y + self.bounding.height,
        );
        distance((x, y), corner) * scale < GROUP_RESIZE_RADIUS
    }

    /// Ids of the nodes whose bounding box overlaps this group, from an
    /// iterator of `(id, bounding)` pairs supplied by the graph.
    pub fn captured_nodes<I>(&self, nodes: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = (NodeId, Rect)>,
    {
        nodes
            .into_iter()
            .filter(|(_, bounds)| self.bounding.overlaps(bounds))
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_group_has_minimum_size() {
        let group = Group::new("Loader");
        assert_eq!(group.bounding.width, GROUP_MIN_WIDTH);
        assert_eq!(group.bounding.height, GROUP_MIN_HEIGHT);
    }

    #[test]
    fn test_set_size_clamps_to_minimum() {
        let mut group = Group::new("G");
        group.set_size(20.0, 30.0);
        assert_eq!(group.bounding.width, GROUP_MIN_WIDTH);
        assert_eq!(group.bounding.height, GROUP_MIN_HEIGHT);

        group.set_size(400.0, 300.0);
        assert_eq!(group.bounding.width, 400.0);
        assert_eq!(group.bounding.height, 300.0);
    }

    #[test]
    fn test_move_by_translates_bounding() {
        let mut group = Group::new("G");
        group.bounding = Rect::new(10.0, 20.0, 200.0, 100.0);
        group.move_by(5.0, -5.0);
        assert_eq!(group.bounding.x, 15.0);
        assert_eq!(group.bounding.y, 15.0);
    }

    #[test]
    fn test_round_position() {
        let mut group = Group::new("G");
        group.bounding = Rect::new(10.4, 19.6, 200.0, 100.0);
        group.round_position();
        assert_eq!(group.bounding.x, 10.0);
        assert_eq!(group.bounding.y, 20.0);
    }

    #[test]
    fn test_resize_corner_scales_with_zoom() {
        let mut group = Group::new("G");
        group.bounding = Rect::new(0.0, 0.0, 200.0, 100.0);

        // 8 graph units from the corner: inside at scale 1, outside at 2x
        assert!(group.is_over_resize_corner(194.0, 94.0, 1.0));
        assert!(!group.is_over_resize_corner(194.0, 94.0, 2.0));
        // Zoomed out, a farther grab still works
        assert!(group.is_over_resize_corner(185.0, 85.0, 0.4));
    }

    #[test]
    fn test_captured_nodes_overlap_only() {
        let mut group = Group::new("G");
        group.bounding = Rect::new(0.0, 0.0, 200.0, 200.0);

        let nodes = vec![
            (1, Rect::new(50.0, 50.0, 100.0, 60.0)),   // inside
            (2, Rect::new(190.0, 190.0, 100.0, 60.0)), // partial overlap
            (3, Rect::new(500.0, 500.0, 100.0, 60.0)), // outside
        ];
        let captured = group.captured_nodes(nodes);
        assert!(captured.contains(&1));
        assert!(captured.contains(&2));
        assert!(!captured.contains(&3));
    }
}
