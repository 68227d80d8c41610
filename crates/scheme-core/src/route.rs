//! Orthogonal line routing between card anchors.
//!
//! Every line is two straight segments: start → elbow → end. The first
//! segment leaves the start anchor along the axis of its side. When the end
//! side is known the final point is pulled back towards the start by the
//! marker offset so the arrow marker sits outside the card.

use crate::geometry::{Bounds, Point};
use crate::model::Side;
use smallvec::SmallVec;
use std::fmt::Write;

/// Midpoint of one edge of `bounds`.
pub fn anchor_point(bounds: &Bounds, side: Side) -> Point {
    match side {
        Side::Top => Point::new(bounds.x + bounds.width / 2.0, bounds.y),
        Side::Right => Point::new(bounds.right(), bounds.y + bounds.height / 2.0),
        Side::Bottom => Point::new(bounds.x + bounds.width / 2.0, bounds.bottom()),
        Side::Left => Point::new(bounds.x, bounds.y + bounds.height / 2.0),
    }
}

/// A routed polyline. Always three points for a card-to-card line.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePath {
    pub points: SmallVec<[Point; 3]>,
    /// Drawn dashed: the end side is not known yet (drawing preview).
    pub preview: bool,
}

impl LinePath {
    pub fn start(&self) -> Point {
        self.points.first().copied().unwrap_or_default()
    }

    pub fn end(&self) -> Point {
        self.points.last().copied().unwrap_or_default()
    }

    /// SVG path data: `M x y L x y L x y`.
    pub fn to_svg_d(&self) -> String {
        let mut d = String::new();
        for (i, p) in self.points.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            let _ = write!(d, "{cmd} {} {}", p.x, p.y);
        }
        d
    }

    /// Consecutive point pairs.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Route from `p1` (leaving through `side1`) to `p2`.
///
/// `end_side` is `None` while the user is still drawing; the path is then a
/// preview and no marker pullback is applied.
pub fn route_line(
    p1: Point,
    side1: Side,
    p2: Point,
    end_side: Option<Side>,
    marker_offset: f32,
) -> LinePath {
    let pull = |from: f32, to: f32| if to > from { -marker_offset } else { marker_offset };
    let (elbow, end) = if side1.is_horizontal() {
        let mut end = p2;
        if end_side.is_some() {
            end.y = p2.y + pull(p1.y, p2.y);
        }
        (Point::new(p2.x, p1.y), end)
    } else {
        let mut end = p2;
        if end_side.is_some() {
            end.x = p2.x + pull(p1.x, p2.x);
        }
        (Point::new(p1.x, p2.y), end)
    };
    LinePath {
        points: SmallVec::from_buf([p1, elbow, end]),
        preview: end_side.is_none(),
    }
}

/// Route a committed line between two card bounds.
pub fn route_between(
    start: &Bounds,
    start_side: Side,
    end: &Bounds,
    end_side: Side,
    marker_offset: f32,
) -> LinePath {
    route_line(
        anchor_point(start, start_side),
        start_side,
        anchor_point(end, end_side),
        Some(end_side),
        marker_offset,
    )
}
