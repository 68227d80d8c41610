//! Hit testing: pointer position → card, connection point, or line.
//!
//! Cards are tested in reverse insertion order (last painted = topmost).
//! Point tests work in canvas space; the marquee test works in screen space
//! so it matches what the user sees regardless of zoom.

use kurbo::{Line as Segment, ParamCurveNearest, Point as KPoint};
use scheme_core::geometry::{Bounds, CanvasView, Point};
use scheme_core::graph::BoardGraph;
use scheme_core::id::{CardId, LineId};
use scheme_core::model::Side;
use scheme_core::route::anchor_point;

/// Radius (canvas units) of a connection-point handle.
pub const CONNECTION_POINT_RADIUS: f32 = 10.0;
/// Extra pick distance around a line's stroke.
pub const LINE_PICK_SLOP: f32 = 4.0;
/// Height (canvas units) of the header band that acts as the drag handle.
pub const HEADER_HEIGHT: f32 = 44.0;

/// Topmost card whose bounds contain `p`.
pub fn hit_card(graph: &BoardGraph, p: Point) -> Option<CardId> {
    graph
        .cards()
        .iter()
        .rev()
        .find(|c| c.bounds().contains(p.x, p.y))
        .map(|c| c.id)
}

/// Topmost card under `p`, but only when `p` lies in its header band.
/// A body row covering another card's header shadows it.
pub fn hit_header(graph: &BoardGraph, p: Point) -> Option<CardId> {
    let id = hit_card(graph, p)?;
    let card = graph.card(id)?;
    (p.y - card.position.y <= HEADER_HEIGHT).then_some(id)
}

/// Connection point under `p`, on the topmost card that has one there.
pub fn hit_connection_point(graph: &BoardGraph, p: Point, radius: f32) -> Option<(CardId, Side)> {
    let r2 = radius * radius;
    graph.cards().iter().rev().find_map(|card| {
        let b = card.bounds();
        Side::ALL.into_iter().find_map(|side| {
            let a = anchor_point(&b, side);
            let (dx, dy) = (a.x - p.x, a.y - p.y);
            (dx * dx + dy * dy <= r2).then_some((card.id, side))
        })
    })
}

/// Topmost line whose routed path passes within its half-thickness plus
/// [`LINE_PICK_SLOP`] of `p`.
pub fn hit_line(graph: &BoardGraph, p: Point, marker_offset: f32) -> Option<LineId> {
    let target = KPoint::new(p.x as f64, p.y as f64);
    graph.lines().iter().rev().find_map(|line| {
        let path = graph.line_path(line, marker_offset)?;
        let reach = (line.thickness / 2.0 + LINE_PICK_SLOP) as f64;
        path.segments()
            .any(|(a, b)| {
                let seg = Segment::new((a.x as f64, a.y as f64), (b.x as f64, b.y as f64));
                seg.nearest(target, 1e-6).distance_sq <= reach * reach
            })
            .then_some(line.id)
    })
}

/// Cards whose on-screen rectangle strictly intersects `screen_rect`.
pub fn marquee_hits(graph: &BoardGraph, view: &CanvasView, screen_rect: &Bounds) -> Vec<CardId> {
    graph
        .cards()
        .iter()
        .filter(|c| view.bounds_to_screen(&c.bounds()).intersects(screen_rect))
        .map(|c| c.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheme_core::model::{Card, Line};

    fn board() -> BoardGraph {
        let mut g = BoardGraph::new();
        g.insert_card(Card::new(CardId::intern("hit_a"), Point::new(0.0, 0.0)));
        g.insert_card(Card::new(CardId::intern("hit_b"), Point::new(200.0, 100.0)));
        g.insert_card(Card::new(CardId::intern("hit_c"), Point::new(1000.0, 0.0)));
        g
    }

    #[test]
    fn topmost_card_wins() {
        let g = board();
        assert_eq!(hit_card(&g, Point::new(250.0, 150.0)), Some(CardId::intern("hit_b")));
        assert_eq!(hit_card(&g, Point::new(10.0, 10.0)), Some(CardId::intern("hit_a")));
        assert_eq!(hit_card(&g, Point::new(-10.0, 10.0)), None);
    }

    #[test]
    fn header_band_only() {
        let g = board();
        assert_eq!(hit_header(&g, Point::new(10.0, 10.0)), Some(CardId::intern("hit_a")));
        assert_eq!(hit_header(&g, Point::new(10.0, 44.0)), Some(CardId::intern("hit_a")));
        assert_eq!(hit_header(&g, Point::new(10.0, 60.0)), None);
        // Card b's header sits over card a's body.
        assert_eq!(hit_header(&g, Point::new(250.0, 120.0)), Some(CardId::intern("hit_b")));
        assert_eq!(hit_header(&g, Point::new(250.0, 200.0)), None);
    }

    #[test]
    fn connection_points_on_edge_midpoints() {
        let g = board();
        assert_eq!(
            hit_connection_point(&g, Point::new(1190.0, 3.0), CONNECTION_POINT_RADIUS),
            Some((CardId::intern("hit_c"), Side::Top))
        );
        assert_eq!(
            hit_connection_point(&g, Point::new(1190.0, 140.0), CONNECTION_POINT_RADIUS),
            None
        );
    }

    #[test]
    fn line_pick_uses_thickness() {
        let mut g = board();
        let id = LineId::intern("hit_line");
        g.insert_line(Line {
            id,
            start: CardId::intern("hit_a"),
            start_side: Side::Right,
            end: CardId::intern("hit_c"),
            end_side: Side::Left,
            color: "#0f62fe".into(),
            thickness: 4.0,
        });
        // Horizontal run at y = 140 from x = 380 to x = 1000.
        assert_eq!(hit_line(&g, Point::new(700.0, 145.0), 12.0), Some(id));
        assert_eq!(hit_line(&g, Point::new(700.0, 150.0), 12.0), None);
    }

    #[test]
    fn marquee_is_screen_space_and_strict() {
        let g = board();
        let view = CanvasView {
            x: 0.0,
            y: 0.0,
            scale: 0.5,
            is_panning: false,
        };
        // At half scale, card a covers screen (0,0)-(190,140); card c starts at x=500.
        let rect = Bounds::from_corners(Point::new(180.0, 10.0), Point::new(520.0, 20.0));
        let hits = marquee_hits(&g, &view, &rect);
        assert_eq!(hits, vec![CardId::intern("hit_a"), CardId::intern("hit_c")]);

        let touching = Bounds::from_corners(Point::new(190.0, 0.0), Point::new(195.0, 40.0));
        assert!(marquee_hits(&g, &view, &touching).is_empty());
    }
}
