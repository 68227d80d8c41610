//! Canvas geometry: points, bounds, grid snapping, and the pan/zoom view.
//!
//! Card positions live in *canvas* units. The browser reports pointer
//! positions in *screen* units; [`CanvasView`] maps between the two under a
//! pan offset and a uniform scale (`screen = canvas * scale + offset`).

use serde::{Deserialize, Serialize};

/// A point in either canvas or screen space (the caller knows which).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rectangle spanning two corner points in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Strict overlap test: rectangles that merely touch do not intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }
}

/// Browser window dimensions in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// Round a canvas coordinate to the nearest grid line.
pub fn snap_to_grid(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

/// Pan/zoom state of the board. Transient: never part of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasView {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub is_panning: bool,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            is_panning: false,
        }
    }
}

impl CanvasView {
    pub fn screen_to_canvas(&self, p: Point) -> Point {
        Point {
            x: (p.x - self.x) / self.scale,
            y: (p.y - self.y) / self.scale,
        }
    }

    pub fn canvas_to_screen(&self, p: Point) -> Point {
        Point {
            x: p.x * self.scale + self.x,
            y: p.y * self.scale + self.y,
        }
    }

    /// Project canvas-space bounds into screen space.
    pub fn bounds_to_screen(&self, b: &Bounds) -> Bounds {
        let origin = self.canvas_to_screen(Point::new(b.x, b.y));
        Bounds {
            x: origin.x,
            y: origin.y,
            width: b.width * self.scale,
            height: b.height * self.scale,
        }
    }

    /// The part of the canvas currently visible in the viewport.
    pub fn visible_canvas(&self, viewport: Viewport) -> Bounds {
        let top_left = self.screen_to_canvas(Point::new(0.0, 0.0));
        let bottom_right = self.screen_to_canvas(Point::new(viewport.width, viewport.height));
        Bounds::from_corners(top_left, bottom_right)
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// Zoom around a screen-space anchor so the canvas point under the
    /// anchor stays fixed. `new_scale` is clamped to `[min, max]`.
    pub fn zoom_at(&mut self, anchor: Point, new_scale: f32, min: f32, max: f32) {
        let new_scale = new_scale.clamp(min, max);
        let ratio = new_scale / self.scale;
        self.x = anchor.x - (anchor.x - self.x) * ratio;
        self.y = anchor.y - (anchor.y - self.y) * ratio;
        self.scale = new_scale;
    }

    /// CSS transform string for the canvas layer.
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.x, self.y, self.scale
        )
    }
}

/// Bottom-right placement of a `width × height` block inside the visible
/// canvas, keeping `padding` from the edges but never leaving the top-left.
pub fn bottom_right_placement(
    view: &CanvasView,
    viewport: Viewport,
    width: f32,
    height: f32,
    padding: f32,
) -> Point {
    let visible = view.visible_canvas(viewport);
    Point {
        x: (visible.x + padding).max(visible.right() - width - padding),
        y: (visible.y + padding).max(visible.bottom() - height - padding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_canvas_roundtrip() {
        let view = CanvasView {
            x: 120.0,
            y: -40.0,
            scale: 2.0,
            is_panning: false,
        };
        let screen = Point::new(320.0, 160.0);
        let canvas = view.screen_to_canvas(screen);
        assert_eq!(canvas, Point::new(100.0, 100.0));
        assert_eq!(view.canvas_to_screen(canvas), screen);
    }

    #[test]
    fn snap_rounds_to_nearest_line() {
        assert_eq!(snap_to_grid(34.0, 70.0), 0.0);
        assert_eq!(snap_to_grid(36.0, 70.0), 70.0);
        assert_eq!(snap_to_grid(-36.0, 70.0), -70.0);
        assert_eq!(snap_to_grid(470.0, 70.0), 490.0);
        assert_eq!(snap_to_grid(13.0, 0.0), 13.0);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut view = CanvasView::default();
        let anchor = Point::new(400.0, 300.0);
        let before = view.screen_to_canvas(anchor);
        view.zoom_at(anchor, 1.5, 0.1, 3.0);
        let after = view.screen_to_canvas(anchor);
        assert!((before.x - after.x).abs() < 1e-3);
        assert!((before.y - after.y).abs() < 1e-3);
        assert_eq!(view.scale, 1.5);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = CanvasView::default();
        view.zoom_at(Point::default(), 10.0, 0.1, 3.0);
        assert_eq!(view.scale, 3.0);
        view.zoom_at(Point::default(), 0.0, 0.1, 3.0);
        assert_eq!(view.scale, 0.1);
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Bounds::new(9.0, 9.0, 5.0, 5.0)));
    }

    #[test]
    fn placement_respects_padding() {
        let view = CanvasView::default();
        let viewport = Viewport {
            width: 1000.0,
            height: 800.0,
        };
        let p = bottom_right_placement(&view, viewport, 380.0, 280.0, 50.0);
        assert_eq!(p, Point::new(570.0, 470.0));

        // A block wider than the viewport falls back to the top-left padding.
        let p = bottom_right_placement(&view, viewport, 2000.0, 280.0, 50.0);
        assert_eq!(p.x, 50.0);
    }
}
