//! Canvas2D software renderer.
//!
//! Draws the board to an HTML `<canvas>` via `CanvasRenderingContext2d`:
//! dot grid, lines, cards, the in-progress line, then the marquee. Board
//! content is drawn under the view transform; the marquee is screen space.

use scheme_core::geometry::{Bounds, CanvasView};
use scheme_core::model::{COIN_EMPTY, COIN_FULL, Card, Side};
use scheme_core::route::{LinePath, anchor_point};
use scheme_editor::BoardEngine;
use scheme_render::hit::{CONNECTION_POINT_RADIUS, HEADER_HEIGHT as HEADER_BAND};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

const CARD_RADIUS: f64 = 12.0;
const HEADER_HEIGHT: f64 = HEADER_BAND as f64;
const ROW_HEIGHT: f64 = 30.0;
const MARKER_RADIUS: f64 = 5.0;
const SELECTION_COLOR: &str = "#0f62fe";

/// Theme-dependent colors for the canvas renderer.
pub struct CanvasTheme {
    pub bg: &'static str,
    pub grid: &'static str,
    pub card_body: &'static str,
    pub card_body_dark: &'static str,
    pub card_text: &'static str,
    pub card_text_dark: &'static str,
    pub card_border: &'static str,
    pub locked_border: &'static str,
}

impl CanvasTheme {
    pub fn light() -> Self {
        Self {
            bg: "#F5F5F7",
            grid: "rgba(0, 0, 0, 0.08)",
            card_body: "#FFFFFF",
            card_body_dark: "#2B2B2B",
            card_text: "#1D1D1F",
            card_text_dark: "#F5F5F7",
            card_border: "rgba(0, 0, 0, 0.2)",
            locked_border: "#999999",
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: "#1C1C1E",
            grid: "rgba(255, 255, 255, 0.06)",
            card_body: "#2C2C2E",
            card_body_dark: "#111111",
            card_text: "#F5F5F7",
            card_text_dark: "#F5F5F7",
            card_border: "rgba(255, 255, 255, 0.15)",
            locked_border: "#636366",
        }
    }
}

/// Render the whole board to a Canvas2D context.
pub fn render_board(
    ctx: &CanvasRenderingContext2d,
    engine: &BoardEngine,
    canvas_width: f64,
    canvas_height: f64,
    theme: &CanvasTheme,
) {
    ctx.set_fill_style_str(theme.bg);
    ctx.fill_rect(0.0, 0.0, canvas_width, canvas_height);

    let view = engine.view();
    let grid = engine.config().grid_size as f64;
    draw_grid(ctx, view, grid, canvas_width, canvas_height, theme);

    ctx.save();
    let _ = ctx.translate(view.x as f64, view.y as f64);
    let _ = ctx.scale(view.scale as f64, view.scale as f64);

    let graph = engine.graph();
    let selection = engine.selection();
    let marker_offset = engine.config().marker_offset;
    for line in graph.lines() {
        let Some(path) = graph.line_path(line, marker_offset) else {
            continue;
        };
        let color = if selection.line() == Some(line.id) {
            SELECTION_COLOR
        } else {
            line.color.as_str()
        };
        draw_path(ctx, &path, line.thickness as f64, color);
    }

    for card in graph.cards() {
        draw_card(ctx, card, selection.contains(card.id), theme);
    }

    if let Some(draft) = engine.draft() {
        if let Some(card) = graph.card(draft.start) {
            draw_connection_points(ctx, card);
        }
    }
    if let Some(path) = engine.draft_path() {
        let (color, _) = engine.line_style();
        draw_path(ctx, &path, 3.0, color);
    }

    ctx.restore();

    if let Some(rect) = engine.marquee_rect() {
        draw_marquee_rect(ctx, &rect);
    }
    log::trace!("canvas frame: {} cards", graph.cards().len());
}

fn draw_card(ctx: &CanvasRenderingContext2d, card: &Card, selected: bool, theme: &CanvasTheme) {
    let b = card.bounds();
    let (x, y, w, h) = (b.x as f64, b.y as f64, b.width as f64, b.height as f64);

    ctx.set_fill_style_str(if card.dark_mode {
        theme.card_body_dark
    } else {
        theme.card_body
    });
    rounded_rect_path(ctx, x, y, w, h, CARD_RADIUS);
    ctx.fill();

    // Header: clip to the card shape so the top corners stay rounded.
    ctx.save();
    rounded_rect_path(ctx, x, y, w, h, CARD_RADIUS);
    ctx.clip();
    ctx.set_fill_style_str(&card.header_bg);
    ctx.fill_rect(x, y, w, HEADER_HEIGHT);
    ctx.restore();

    ctx.set_fill_style_str("#FFFFFF");
    ctx.set_font("600 18px Inter, system-ui, sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    let _ = ctx.fill_text(&card.title, x + w / 2.0, y + HEADER_HEIGHT / 2.0);
    if card.locked {
        ctx.set_font("14px Inter, system-ui, sans-serif");
        let _ = ctx.fill_text("🔒", x + w - 20.0, y + HEADER_HEIGHT / 2.0);
    }

    let text = if card.dark_mode {
        theme.card_text_dark
    } else {
        theme.card_text
    };
    ctx.set_font("14px Inter, system-ui, sans-serif");
    ctx.set_text_align("left");
    let mut row_y = y + HEADER_HEIGHT + ROW_HEIGHT / 2.0 + 6.0;
    for row in &card.body {
        if row_y > y + h - 8.0 {
            break;
        }
        ctx.set_fill_style_str(text);
        let _ = ctx.fill_text(&format!("{} {}", row.label, row.value), x + 52.0, row_y);
        row_y += ROW_HEIGHT;
    }

    let coin = if card.coin_full { COIN_FULL } else { COIN_EMPTY };
    ctx.set_fill_style_str(coin);
    ctx.begin_path();
    let _ = ctx.arc(x + 30.0, y + HEADER_HEIGHT + 28.0, 12.0, 0.0, std::f64::consts::TAU);
    ctx.fill();

    if let Some(color) = card.note.as_ref().and_then(|n| n.indicator_color()) {
        ctx.set_fill_style_str(color);
        ctx.begin_path();
        let _ = ctx.arc(x + w - 14.0, y + h - 14.0, 6.0, 0.0, std::f64::consts::TAU);
        ctx.fill();
    }

    let (outline, width) = if selected {
        (SELECTION_COLOR, 3.0)
    } else if card.locked {
        (theme.locked_border, 2.0)
    } else {
        (theme.card_border, 1.0)
    };
    ctx.set_stroke_style_str(outline);
    ctx.set_line_width(width);
    rounded_rect_path(ctx, x, y, w, h, CARD_RADIUS);
    ctx.stroke();
}

/// Circles on the four sides of the card a line is being drawn from.
fn draw_connection_points(ctx: &CanvasRenderingContext2d, card: &Card) {
    let bounds = card.bounds();
    ctx.set_fill_style_str("#FFFFFF");
    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(2.0);
    for side in Side::ALL {
        let p = anchor_point(&bounds, side);
        ctx.begin_path();
        let _ = ctx.arc(
            p.x as f64,
            p.y as f64,
            CONNECTION_POINT_RADIUS as f64 * 0.6,
            0.0,
            std::f64::consts::TAU,
        );
        ctx.fill();
        ctx.stroke();
    }
}

fn draw_path(ctx: &CanvasRenderingContext2d, path: &LinePath, width: f64, color: &str) {
    ctx.save();
    ctx.set_stroke_style_str(color);
    ctx.set_fill_style_str(color);
    ctx.set_line_width(width);
    ctx.set_line_join("round");
    if path.preview {
        let _ = ctx.set_line_dash(&js_sys::Array::of2(
            &JsValue::from_f64(8.0),
            &JsValue::from_f64(6.0),
        ));
    }

    ctx.begin_path();
    for (i, p) in path.points.iter().enumerate() {
        if i == 0 {
            ctx.move_to(p.x as f64, p.y as f64);
        } else {
            ctx.line_to(p.x as f64, p.y as f64);
        }
    }
    ctx.stroke();

    for p in [path.start(), path.end()] {
        ctx.begin_path();
        let _ = ctx.arc(
            p.x as f64,
            p.y as f64,
            MARKER_RADIUS.max(width),
            0.0,
            std::f64::consts::TAU,
        );
        ctx.fill();
    }
    ctx.restore();
}

/// Dots at grid intersections, following pan and zoom.
fn draw_grid(
    ctx: &CanvasRenderingContext2d,
    view: &CanvasView,
    grid: f64,
    width: f64,
    height: f64,
    theme: &CanvasTheme,
) {
    let spacing = grid * view.scale as f64;
    // Too dense to be useful when zoomed far out.
    if spacing < 8.0 {
        return;
    }
    ctx.set_fill_style_str(theme.grid);
    let mut x = (view.x as f64).rem_euclid(spacing);
    while x < width {
        let mut y = (view.y as f64).rem_euclid(spacing);
        while y < height {
            ctx.fill_rect(x - 1.0, y - 1.0, 2.0, 2.0);
            y += spacing;
        }
        x += spacing;
    }
}

/// Draw the marquee (rubber-band) selection rectangle.
fn draw_marquee_rect(ctx: &CanvasRenderingContext2d, rect: &Bounds) {
    let (x, y, w, h) = (
        rect.x as f64,
        rect.y as f64,
        rect.width as f64,
        rect.height as f64,
    );
    if w < 1.0 && h < 1.0 {
        return;
    }

    ctx.save();
    ctx.set_fill_style_str("rgba(15, 98, 254, 0.12)");
    ctx.fill_rect(x, y, w, h);
    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(1.0);
    let _ = ctx.set_line_dash(&js_sys::Array::of2(
        &JsValue::from_f64(4.0),
        &JsValue::from_f64(3.0),
    ));
    ctx.stroke_rect(x, y, w, h);
    ctx.restore();
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn rounded_rect_path(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
    let r = r.min(w / 2.0).min(h / 2.0);
    ctx.begin_path();
    ctx.move_to(x + r, y);
    ctx.line_to(x + w - r, y);
    ctx.arc_to(x + w, y, x + w, y + r, r).unwrap_or(());
    ctx.line_to(x + w, y + h - r);
    ctx.arc_to(x + w, y + h, x + w - r, y + h, r).unwrap_or(());
    ctx.line_to(x + r, y + h);
    ctx.arc_to(x, y + h, x, y + h - r, r).unwrap_or(());
    ctx.line_to(x, y + r);
    ctx.arc_to(x, y, x + r, y, r).unwrap_or(());
    ctx.close_path();
}
