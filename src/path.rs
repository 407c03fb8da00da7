//! Link path geometry: SVG command generation, sampling and distance
//! queries for the three link rendering styles.
//!
//! A link's shape depends on the connection direction of each endpoint
//! (outputs leave to the right, inputs enter from the left, collapsed or
//! vertical layouts use up/down) and on the canvas-wide render mode.

use crate::geometry::distance;

/// Which way a link leaves or enters its endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkDirection {
    Up,
    Down,
    Left,
    #[default]
    Right,
    /// No directional bias (free link ends while dragging).
    Center,
}

impl LinkDirection {
    /// Unit vector of the direction, y-down screen convention.
    pub fn vector(self) -> (f32, f32) {
        match self {
            LinkDirection::Up => (0.0, -1.0),
            LinkDirection::Down => (0.0, 1.0),
            LinkDirection::Left => (-1.0, 0.0),
            LinkDirection::Right => (1.0, 0.0),
            LinkDirection::Center => (0.0, 0.0),
        }
    }

    /// The direction a link *enters* a slot facing this way.
    pub fn reversed(self) -> Self {
        match self {
            LinkDirection::Up => LinkDirection::Down,
            LinkDirection::Down => LinkDirection::Up,
            LinkDirection::Left => LinkDirection::Right,
            LinkDirection::Right => LinkDirection::Left,
            LinkDirection::Center => LinkDirection::Center,
        }
    }
}

/// Canvas-wide link rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkRenderMode {
    /// Cubic bezier curves (default).
    #[default]
    Spline,
    /// Short stubs plus a straight segment.
    Linear,
    /// Axis-aligned stepped segments.
    Straight,
}

/// Distance under which any link collapses to a plain line to avoid
/// zig-zags, scaled by zoom.
const SHORT_LINK_THRESHOLD: f32 = 10.0;

/// Cubic bezier used for spline links and their hit tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: (f32, f32),
    pub p1: (f32, f32),
    pub p2: (f32, f32),
    pub p3: (f32, f32),
}

impl CubicBezier {
    /// Build the spline for a link, extending control points along each
    /// endpoint's direction. The control offset grows with the endpoint
    /// distance and never drops below `min_offset * zoom`.
    pub fn from_link(
        start: (f32, f32),
        end: (f32, f32),
        start_dir: LinkDirection,
        end_dir: LinkDirection,
        zoom: f32,
        min_offset: f32,
    ) -> Self {
        let dist = distance(start, end);
        // near-coincident endpoints render as a plain line; keep the
        // control points degenerate so hit tests agree
        if dist < SHORT_LINK_THRESHOLD * zoom {
            return CubicBezier {
                p0: start,
                p1: start,
                p2: end,
                p3: end,
            };
        }
        let offset = (dist * 0.25).max(min_offset * zoom);
        let sv = start_dir.vector();
        let ev = end_dir.vector();
        CubicBezier {
            p0: start,
            p1: (start.0 + sv.0 * offset, start.1 + sv.1 * offset),
            p2: (end.0 + ev.0 * offset, end.1 + ev.1 * offset),
            p3: end,
        }
    }

    /// Evaluate at parameter `t` in `[0, 1]`.
    pub fn eval(&self, t: f32) -> (f32, f32) {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;
        (
            mt3 * self.p0.0 + 3.0 * mt2 * t * self.p1.0 + 3.0 * mt * t2 * self.p2.0 + t3 * self.p3.0,
            mt3 * self.p0.1 + 3.0 * mt2 * t * self.p1.1 + 3.0 * mt * t2 * self.p2.1 + t3 * self.p3.1,
        )
    }
}

fn fmt_path(points: &[(f32, f32)]) -> String {
    let mut out = String::with_capacity(points.len() * 16);
    for (i, p) in points.iter().enumerate() {
        if i == 0 {
            out.push_str(&format!("M {} {}", p.0, p.1));
        } else {
            out.push_str(&format!(" L {} {}", p.0, p.1));
        }
    }
    out
}

/// The polyline a non-spline link follows, including both endpoints.
fn link_polyline(
    start: (f32, f32),
    end: (f32, f32),
    start_dir: LinkDirection,
    end_dir: LinkDirection,
    mode: LinkRenderMode,
) -> Vec<(f32, f32)> {
    let sv = start_dir.vector();
    let ev = end_dir.vector();
    match mode {
        LinkRenderMode::Linear => {
            let stub = 15.0;
            vec![
                start,
                (start.0 + sv.0 * stub, start.1 + sv.1 * stub),
                (end.0 + ev.0 * stub, end.1 + ev.1 * stub),
                end,
            ]
        }
        LinkRenderMode::Straight => {
            let stub = 10.0;
            let s = (start.0 + sv.0 * stub, start.1 + sv.1 * stub);
            let e = (end.0 + ev.0 * stub, end.1 + ev.1 * stub);
            let mid_x = (s.0 + e.0) * 0.5;
            vec![start, s, (mid_x, s.1), (mid_x, e.1), e, end]
        }
        LinkRenderMode::Spline => vec![start, end],
    }
}

/// Generate the SVG path commands for a link.
///
/// Near-coincident endpoints always degrade to a plain line segment.
pub fn generate_link_path(
    start: (f32, f32),
    end: (f32, f32),
    start_dir: LinkDirection,
    end_dir: LinkDirection,
    mode: LinkRenderMode,
    zoom: f32,
    min_offset: f32,
) -> String {
    if distance(start, end) < SHORT_LINK_THRESHOLD * zoom {
        return fmt_path(&[start, end]);
    }

    match mode {
        LinkRenderMode::Spline => {
            let b = CubicBezier::from_link(start, end, start_dir, end_dir, zoom, min_offset);
            format!(
                "M {} {} C {} {} {} {} {} {}",
                b.p0.0, b.p0.1, b.p1.0, b.p1.1, b.p2.0, b.p2.1, b.p3.0, b.p3.1
            )
        }
        _ => fmt_path(&link_polyline(start, end, start_dir, end_dir, mode)),
    }
}

/// Point on the link at parameter `t` in `[0, 1]`, for any render mode.
pub fn position_on_link(
    start: (f32, f32),
    end: (f32, f32),
    start_dir: LinkDirection,
    end_dir: LinkDirection,
    mode: LinkRenderMode,
    zoom: f32,
    min_offset: f32,
    t: f32,
) -> (f32, f32) {
    let t = t.clamp(0.0, 1.0);
    match mode {
        LinkRenderMode::Spline => {
            CubicBezier::from_link(start, end, start_dir, end_dir, zoom, min_offset).eval(t)
        }
        _ => {
            let points = link_polyline(start, end, start_dir, end_dir, mode);
            // arc-length parameterization over the polyline
            let lengths: Vec<f32> = points.windows(2).map(|w| distance(w[0], w[1])).collect();
            let total: f32 = lengths.iter().sum();
            if total <= f32::EPSILON {
                return start;
            }
            let mut remaining = t * total;
            for (i, len) in lengths.iter().enumerate() {
                if remaining <= *len || i == lengths.len() - 1 {
                    let f = if *len <= f32::EPSILON {
                        0.0
                    } else {
                        remaining / len
                    };
                    let (a, b) = (points[i], points[i + 1]);
                    return (a.0 + (b.0 - a.0) * f, a.1 + (b.1 - a.1) * f);
                }
                remaining -= len;
            }
            end
        }
    }
}

/// Midpoint of the link, used for the link-menu hot zone.
pub fn link_center(
    start: (f32, f32),
    end: (f32, f32),
    start_dir: LinkDirection,
    end_dir: LinkDirection,
    mode: LinkRenderMode,
    zoom: f32,
    min_offset: f32,
) -> (f32, f32) {
    position_on_link(start, end, start_dir, end_dir, mode, zoom, min_offset, 0.5)
}

fn distance_to_segment_sq(point: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (point.0 - a.0, point.1 - a.1);
    let len_sq = ab.0 * ab.0 + ab.1 * ab.1;
    if len_sq < f32::EPSILON {
        return ap.0 * ap.0 + ap.1 * ap.1;
    }
    let t = ((ap.0 * ab.0 + ap.1 * ab.1) / len_sq).clamp(0.0, 1.0);
    let closest = (a.0 + t * ab.0, a.1 + t * ab.1);
    let dx = point.0 - closest.0;
    let dy = point.1 - closest.1;
    dx * dx + dy * dy
}

/// Minimum distance from a point to a link, by sampling the link shape
/// into `num_samples` segments.
#[allow(clippy::too_many_arguments)]
pub fn distance_to_link(
    point: (f32, f32),
    start: (f32, f32),
    end: (f32, f32),
    start_dir: LinkDirection,
    end_dir: LinkDirection,
    mode: LinkRenderMode,
    zoom: f32,
    min_offset: f32,
    num_samples: usize,
) -> f32 {
    let num_samples = if num_samples == 0 { 20 } else { num_samples };
    let mut min_sq = f32::MAX;
    let mut prev = position_on_link(start, end, start_dir, end_dir, mode, zoom, min_offset, 0.0);
    for i in 1..=num_samples {
        let t = i as f32 / num_samples as f32;
        let current =
            position_on_link(start, end, start_dir, end_dir, mode, zoom, min_offset, t);
        min_sq = min_sq.min(distance_to_segment_sq(point, prev, current));
        prev = current;
    }
    min_sq.sqrt()
}
