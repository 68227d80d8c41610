//! Board → Vello drawing commands.
//!
//! Paints lines under cards, then cards in insertion order, then overlays
//! (selection outline, line preview, marquee). Board content is drawn under
//! the view transform; the marquee is already in screen space.

use kurbo::{Affine, BezPath, Circle, Rect, RoundedRect, Stroke};
use peniko::{Color, Fill};
use scheme_core::geometry::{Bounds, CanvasView};
use scheme_core::graph::BoardGraph;
use scheme_core::id::{CardId, LineId};
use scheme_core::model::{COIN_EMPTY, COIN_FULL, Card, Color as BoardColor};
use scheme_core::route::LinePath;
use vello::Scene;

const CARD_RADIUS: f64 = 12.0;
const HEADER_HEIGHT: f64 = crate::hit::HEADER_HEIGHT as f64;
const MARKER_RADIUS: f64 = 5.0;
const SELECTION_COLOR: Color = Color::from_rgb8(0x0f, 0x62, 0xfe);
const MARQUEE_FILL: Color = Color::from_rgba8(0x0f, 0x62, 0xfe, 0x1f);

/// Transient editor state drawn on top of the board.
#[derive(Debug, Clone, Default)]
pub struct Overlay<'a> {
    pub selected_cards: &'a [CardId],
    pub selected_line: Option<LineId>,
    /// In-progress line while drawing (canvas space).
    pub preview: Option<&'a LinePath>,
    pub preview_color: Option<&'a str>,
    /// Marquee rectangle (screen space).
    pub marquee: Option<Bounds>,
    pub marker_offset: f32,
}

/// Paint the whole board. Call once per frame with a cleared `Scene`.
pub fn paint_board(scene: &mut Scene, graph: &BoardGraph, view: &CanvasView, overlay: &Overlay<'_>) {
    let xf = Affine::translate((view.x as f64, view.y as f64)) * Affine::scale(view.scale as f64);

    for line in graph.lines() {
        let Some(path) = graph.line_path(line, overlay.marker_offset) else {
            continue;
        };
        let mut color = css_color(&line.color, SELECTION_COLOR);
        if overlay.selected_line == Some(line.id) {
            color = SELECTION_COLOR;
        }
        paint_path(scene, xf, &path, line.thickness as f64, color);
    }

    for card in graph.cards() {
        let selected = overlay.selected_cards.contains(&card.id);
        paint_card(scene, xf, card, selected);
    }

    if let Some(path) = overlay.preview {
        let color = overlay
            .preview_color
            .map(|c| css_color(c, SELECTION_COLOR))
            .unwrap_or(SELECTION_COLOR);
        paint_path(scene, xf, path, 3.0, color);
    }

    if let Some(m) = overlay.marquee {
        let rect = Rect::new(m.x as f64, m.y as f64, m.right() as f64, m.bottom() as f64);
        scene.fill(Fill::NonZero, Affine::IDENTITY, MARQUEE_FILL, None, &rect);
        scene.stroke(
            &Stroke::new(1.0).with_dashes(0.0, [4.0, 3.0]),
            Affine::IDENTITY,
            SELECTION_COLOR,
            None,
            &rect,
        );
    }
    log::trace!(
        "painted {} cards, {} lines",
        graph.cards().len(),
        graph.lines().len()
    );
}

// ─── Painters ────────────────────────────────────────────────────────────

fn paint_card(scene: &mut Scene, xf: Affine, card: &Card, selected: bool) {
    let b = card.bounds();
    let rect = Rect::new(b.x as f64, b.y as f64, b.right() as f64, b.bottom() as f64);
    let shape = RoundedRect::from_rect(rect, CARD_RADIUS);

    let body = if card.dark_mode {
        Color::from_rgb8(0x2b, 0x2b, 0x2b)
    } else {
        Color::WHITE
    };
    scene.fill(Fill::NonZero, xf, body, None, &shape);

    let header = Rect::new(rect.x0, rect.y0, rect.x1, rect.y0 + HEADER_HEIGHT);
    let header_color = css_color(&card.header_bg, Color::from_rgb8(0x5d, 0x8b, 0xf4));
    scene.fill(
        Fill::NonZero,
        xf,
        header_color,
        None,
        &RoundedRect::from_rect(header, (CARD_RADIUS, CARD_RADIUS, 0.0, 0.0)),
    );

    // Coin next to the PV row.
    let coin = if card.coin_full { COIN_FULL } else { COIN_EMPTY };
    let coin_center = (rect.x0 + 30.0, rect.y0 + HEADER_HEIGHT + 28.0);
    scene.fill(
        Fill::NonZero,
        xf,
        css_color(coin, Color::from_rgb8(0xff, 0xd7, 0x00)),
        None,
        &Circle::new(coin_center, 12.0),
    );

    let (outline, width) = if selected {
        (SELECTION_COLOR, 3.0)
    } else if card.locked {
        (Color::from_rgb8(0x99, 0x99, 0x99), 2.0)
    } else {
        (Color::from_rgba8(0, 0, 0, 0x33), 1.0)
    };
    scene.stroke(&Stroke::new(width), xf, outline, None, &shape);
}

fn paint_path(scene: &mut Scene, xf: Affine, path: &LinePath, width: f64, color: Color) {
    let mut bez = BezPath::new();
    for (i, p) in path.points.iter().enumerate() {
        let pt = (p.x as f64, p.y as f64);
        if i == 0 {
            bez.move_to(pt);
        } else {
            bez.line_to(pt);
        }
    }
    let stroke = if path.preview {
        Stroke::new(width).with_dashes(0.0, [8.0, 6.0])
    } else {
        Stroke::new(width)
    };
    scene.stroke(&stroke, xf, color, None, &bez);

    // Dot markers at both ends.
    for p in [path.start(), path.end()] {
        let dot = Circle::new((p.x as f64, p.y as f64), MARKER_RADIUS.max(width));
        scene.fill(Fill::NonZero, xf, color, None, &dot);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

/// Parse a stored CSS color, falling back when it is not understood.
pub fn css_color(s: &str, fallback: Color) -> Color {
    match BoardColor::parse(s) {
        Some(c) => Color::from_rgba8(c.r, c.g, c.b, c.a),
        None => {
            log::warn!("unrecognized color {s:?}");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_color_fallback() {
        let fb = Color::from_rgb8(1, 2, 3);
        assert_eq!(css_color("#112233", fb), Color::from_rgb8(0x11, 0x22, 0x33));
        assert_eq!(css_color("rgb(93, 139, 244)", fb), Color::from_rgb8(93, 139, 244));
        assert_eq!(css_color("chartreuse", fb), fb);
    }

    #[test]
    fn paints_cards_lines_and_overlays() {
        use scheme_core::geometry::Point;
        use scheme_core::model::{Line, Side};

        let mut g = BoardGraph::new();
        let a = CardId::intern("paint_a");
        let b = CardId::intern("paint_b");
        g.insert_card(Card::new(a, Point::new(0.0, 0.0)));
        g.insert_card(Card::new(b, Point::new(0.0, 700.0)));
        g.insert_line(Line {
            id: LineId::intern("paint_l"),
            start: a,
            start_side: Side::Bottom,
            end: b,
            end_side: Side::Top,
            color: "#0f62fe".into(),
            thickness: 5.0,
        });

        let selected = [a];
        let overlay = Overlay {
            selected_cards: &selected,
            marquee: Some(Bounds::new(10.0, 10.0, 50.0, 50.0)),
            marker_offset: 12.0,
            ..Overlay::default()
        };
        let mut scene = Scene::new();
        paint_board(&mut scene, &g, &CanvasView::default(), &overlay);
        assert!(!scene.encoding().is_empty());
    }
}
