//! WASM bridge for Scheme Board, exposing the board engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web` and driven by the browser
//! page. Structured replies are JSON strings.

mod render2d;
mod verify;

use scheme_core::body::PrintSize;
use scheme_core::error::InputError;
use scheme_core::geometry::{Point, Viewport};
use scheme_core::id::{CardId, LineId};
use scheme_core::model::Branch;
use scheme_core::snapshot::CardDto;
use scheme_core::verify::VerifyRequest;
use scheme_editor::{
    BoardConfig, BoardEngine, BoardEvent, CardOptions, InputEvent, Modifiers, PointerButton,
};
use scheme_render::hit::hit_card;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The main WASM-facing board controller.
///
/// Owns the engine; every interaction from the page goes through it. After
/// each call the host drains `take_events_json` to sync its DOM overlays
/// (note windows, menus).
#[wasm_bindgen]
pub struct SchemeCanvas {
    engine: BoardEngine,
    width: f64,
    height: f64,
    dark_theme: bool,
}

#[wasm_bindgen]
impl SchemeCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();

        let viewport = Viewport {
            width: width as f32,
            height: height as f32,
        };
        let mut engine = BoardEngine::new(BoardConfig::default(), viewport);
        engine.set_today(&today_key());
        Self {
            engine,
            width,
            height,
            dark_theme: false,
        }
    }

    /// Override the date notes are keyed by (`YYYY-MM-DD`).
    pub fn set_today(&mut self, today: &str) {
        self.engine.set_today(today);
    }

    /// Render the board to a Canvas2D context.
    pub fn render(&self, ctx: &CanvasRenderingContext2d) {
        let theme = if self.dark_theme {
            render2d::CanvasTheme::dark()
        } else {
            render2d::CanvasTheme::light()
        };
        render2d::render_board(ctx, &self.engine, self.width, self.height, &theme);
    }

    pub fn set_theme(&mut self, is_dark: bool) {
        self.dark_theme = is_dark;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.engine.set_viewport(Viewport {
            width: width as f32,
            height: height as f32,
        });
    }

    // ─── Pointer / keyboard ──────────────────────────────────────────────

    /// Handle pointer down. Returns true if a repaint is needed.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f32,
        y: f32,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let modifiers = Modifiers {
            ctrl,
            shift,
            alt,
            meta,
        };
        self.engine.handle_input(&InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_index(button),
            modifiers,
        })
    }

    pub fn handle_pointer_move(&mut self, x: f32, y: f32) -> bool {
        self.engine.handle_input(&InputEvent::pointer_move(x, y))
    }

    pub fn handle_pointer_up(&mut self, x: f32, y: f32, button: i16) -> bool {
        self.engine.handle_input(&InputEvent::PointerUp {
            x,
            y,
            button: PointerButton::from_index(button),
        })
    }

    pub fn handle_wheel(&mut self, x: f32, y: f32, delta_y: f32) -> bool {
        self.engine.handle_input(&InputEvent::Wheel { x, y, delta_y })
    }

    /// Handle a keyboard event. Returns true if a shortcut fired.
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> bool {
        let modifiers = Modifiers {
            ctrl,
            shift,
            alt,
            meta,
        };
        self.engine.handle_input(&InputEvent::key(key, modifiers))
    }

    /// Card under a screen point, or `""`.
    pub fn hit_test(&self, x: f32, y: f32) -> String {
        let p = self.engine.view().screen_to_canvas(Point::new(x, y));
        hit_card(self.engine.graph(), p)
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// `{"cards":[..],"line":id|null,"mode":bool}`
    pub fn get_selection_json(&self) -> String {
        let selection = self.engine.selection();
        let cards: Vec<&str> = selection.cards().iter().map(|id| id.as_str()).collect();
        serde_json::json!({
            "cards": cards,
            "line": selection.line().map(|id| id.as_str().to_string()),
            "mode": selection.mode,
        })
        .to_string()
    }

    /// One card in project-file shape, or `"null"`.
    pub fn get_card_json(&self, card_id: &str) -> String {
        self.card(card_id)
            .and_then(|id| self.engine.graph().card(id))
            .map(CardDto::from_card)
            .and_then(|dto| serde_json::to_string(&dto).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    /// `{"x":..,"y":..,"scale":..}`
    pub fn get_view_json(&self) -> String {
        let view = self.engine.view();
        serde_json::json!({ "x": view.x, "y": view.y, "scale": view.scale }).to_string()
    }

    /// Events since the last call, e.g. `[{"type":"noteClosed","id":"card_3"}]`.
    pub fn take_events_json(&mut self) -> String {
        let events: Vec<serde_json::Value> = self
            .engine
            .drain_events()
            .into_iter()
            .map(|event| event_json(&event))
            .collect();
        serde_json::Value::Array(events).to_string()
    }

    pub fn can_undo(&self) -> bool {
        self.engine.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.engine.can_redo()
    }

    // ─── History and files ───────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.engine.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.engine.redo()
    }

    /// Commit after an edit the host finished (text blur, slider release).
    pub fn commit(&mut self) {
        self.engine.commit();
    }

    /// Load a project file. Returns `{"ok":true}` or `{"ok":false,"error":".."}`.
    pub fn load_project(&mut self, text: &str) -> String {
        match self.engine.load_project(text) {
            Ok(()) => ok_json(),
            Err(e) => error_json(&e.to_string()),
        }
    }

    pub fn save_project(&self) -> String {
        self.engine.save_project()
    }

    // ─── Cards and lines ─────────────────────────────────────────────────

    /// Add a card at the bottom-right of the view. Returns its id.
    pub fn add_card(&mut self, large: bool) -> String {
        let id = self.engine.add_card(CardOptions {
            large,
            ..CardOptions::default()
        });
        id.as_str().to_string()
    }

    pub fn load_template(&mut self) -> bool {
        !self.engine.load_template().is_empty()
    }

    pub fn delete_selected(&mut self) -> bool {
        self.engine.delete_selection()
    }

    pub fn copy_selected(&mut self) -> u32 {
        self.engine.copy() as u32
    }

    pub fn paste(&mut self) -> bool {
        !self.engine.paste().is_empty()
    }

    pub fn set_selection_mode(&mut self, on: bool) {
        self.engine.set_selection_mode(on);
    }

    pub fn select_line(&mut self, line_id: &str) -> bool {
        let id = LineId::intern(line_id);
        self.engine.select_line(id)
    }

    // ─── Card decoration ─────────────────────────────────────────────────

    pub fn toggle_lock(&mut self, card_id: &str) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.toggle_lock(id))
    }

    pub fn cycle_header_color(&mut self, card_id: &str) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.cycle_header_color(id))
    }

    pub fn set_header_color(&mut self, card_id: &str, color: &str) -> String {
        let result = match self.card(card_id) {
            Some(id) => self.engine.set_header_color(id, color),
            None => Err(InputError::UnknownCard(card_id.to_string())),
        };
        result_json(result)
    }

    pub fn toggle_dark_mode(&mut self, card_id: &str) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.toggle_dark_mode(id))
    }

    pub fn set_title(&mut self, card_id: &str, title: &str) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.set_title(id, title))
    }

    pub fn set_row_value(&mut self, card_id: &str, row: u32, value: &str) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.set_row_value(id, row as usize, value))
    }

    // ─── PV ──────────────────────────────────────────────────────────────

    /// `branch` is `"left"` or `"right"`.
    pub fn increment_pv(&mut self, card_id: &str, branch: &str, step: u32) -> bool {
        let Some(branch) = Branch::from_name(branch) else {
            return false;
        };
        self.card(card_id)
            .is_some_and(|id| self.engine.increment_pv(id, branch, step))
    }

    pub fn clear_pv(&mut self, card_id: &str) -> bool {
        self.card(card_id).is_some_and(|id| self.engine.clear_pv(id))
    }

    // ─── Line styling ────────────────────────────────────────────────────

    pub fn set_apply_to_all(&mut self, on: bool) {
        self.engine.set_apply_to_all(on);
    }

    /// `{"color":"#0f62fe","thickness":5}`
    pub fn get_line_style_json(&self) -> String {
        let (color, thickness) = self.engine.line_style();
        serde_json::json!({ "color": color, "thickness": thickness }).to_string()
    }

    pub fn set_line_color(&mut self, color: &str) -> String {
        result_json(self.engine.set_line_color(color).map(|_| ()))
    }

    /// Live slider input; commit with `set_line_thickness` on change.
    pub fn preview_line_thickness(&mut self, thickness: f32) -> u32 {
        self.engine.preview_line_thickness(thickness) as u32
    }

    pub fn set_line_thickness(&mut self, thickness: f32) -> u32 {
        self.engine.set_line_thickness(thickness) as u32
    }

    // ─── Notes ───────────────────────────────────────────────────────────

    /// Returns the new visibility, or `false` for an unknown card.
    pub fn toggle_note(&mut self, card_id: &str) -> bool {
        self.card(card_id)
            .and_then(|id| self.engine.toggle_note(id))
            .unwrap_or(false)
    }

    pub fn close_note(&mut self, card_id: &str) -> bool {
        self.card(card_id).is_some_and(|id| self.engine.close_note(id))
    }

    /// Text input; the host calls `commit` on blur.
    pub fn set_note_entry(&mut self, card_id: &str, date: &str, text: &str) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.set_note_entry(id, date, text))
    }

    pub fn set_note_color(&mut self, card_id: &str, color: &str) -> String {
        let result = match self.card(card_id) {
            Some(id) => self.engine.set_note_color(id, color),
            None => Err(InputError::UnknownCard(card_id.to_string())),
        };
        result_json(result)
    }

    pub fn select_note_date(&mut self, card_id: &str, date: &str) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.select_note_date(id, date))
    }

    pub fn resize_note(&mut self, card_id: &str, width: f32, height: f32) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.resize_note(id, width, height))
    }

    pub fn move_note(&mut self, card_id: &str, x: f32, y: f32) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.move_note(id, x, y))
    }

    /// Ids of the notes that were auto-closed, as a JSON array.
    pub fn close_empty_notes(&mut self) -> String {
        let closed_ids = self.engine.close_empty_notes();
        let closed: Vec<&str> = closed_ids
            .iter()
            .map(|id| id.as_str())
            .collect();
        serde_json::json!(closed).to_string()
    }

    pub fn notes_available(&self) -> bool {
        self.engine.notes_available()
    }

    /// Notes dropdown rows, newest first.
    pub fn get_note_digest_json(&self) -> String {
        let rows: Vec<serde_json::Value> = self
            .engine
            .note_digest()
            .into_iter()
            .map(|entry| {
                serde_json::json!({
                    "card": entry.card.as_str(),
                    "date": entry.date,
                    "displayDate": entry.display_date,
                    "preview": entry.preview,
                    "color": entry.color,
                })
            })
            .collect();
        serde_json::Value::Array(rows).to_string()
    }

    pub fn open_note_at(&mut self, card_id: &str, date: &str) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.open_note_at(id, date))
    }

    pub fn delete_note_entry(&mut self, card_id: &str, date: &str) -> bool {
        self.card(card_id)
            .is_some_and(|id| self.engine.delete_note_entry(id, date))
    }
}

impl SchemeCanvas {
    fn card(&self, card_id: &str) -> Option<CardId> {
        let id = CardId::intern(card_id);
        self.engine.graph().contains_card(id).then_some(id)
    }
}

// ─── Standalone functions (no canvas needed) ─────────────────────────────

/// Verify a subscription. Resolves to `{"ok":true,"token":..}` or
/// `{"ok":false,"error":..,"reason":..,"focus":"username"|"code"}`.
#[wasm_bindgen]
pub async fn verify_subscription(username: String, code: String) -> Result<JsValue, JsValue> {
    let request = match VerifyRequest::new(&username, &code) {
        Ok(request) => request,
        Err(e) => {
            let focus = if e == InputError::EmptyCode {
                "code"
            } else {
                "username"
            };
            let reply = serde_json::json!({
                "ok": false,
                "error": e.to_string(),
                "reason": "input",
                "focus": focus,
            });
            return Ok(JsValue::from_str(&reply.to_string()));
        }
    };
    let result = verify::check_subscription(&request).await;
    Ok(JsValue::from_str(&verify::outcome_json(&result)))
}

/// Pixel size for a PNG export. `size` is `"original"` or `"WxH"` in cm.
/// Returns `{"ok":true,"width":..,"height":..}` or an error reply.
#[wasm_bindgen]
pub fn print_size_pixels(size: &str, rendered_width: u32, rendered_height: u32) -> String {
    match PrintSize::parse(size) {
        Ok(size) => {
            let (width, height) = size.to_pixels((rendered_width, rendered_height));
            serde_json::json!({ "ok": true, "width": width, "height": height }).to_string()
        }
        Err(e) => error_json(&e.to_string()),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn event_json(event: &BoardEvent) -> serde_json::Value {
    let (kind, id) = match event {
        BoardEvent::CardCreated(id) => ("cardCreated", Some(id.as_str())),
        BoardEvent::CardDeleted(id) => ("cardDeleted", Some(id.as_str())),
        BoardEvent::LineCreated(id) => ("lineCreated", Some(id.as_str())),
        BoardEvent::LineDeleted(id) => ("lineDeleted", Some(id.as_str())),
        BoardEvent::NoteClosed(id) => ("noteClosed", Some(id.as_str())),
        BoardEvent::Restored => ("restored", None),
        BoardEvent::Changed => ("changed", None),
    };
    match id {
        Some(id) => serde_json::json!({ "type": kind, "id": id }),
        None => serde_json::json!({ "type": kind }),
    }
}

fn ok_json() -> String {
    r#"{"ok":true}"#.to_string()
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "ok": false, "error": message }).to_string()
}

fn result_json(result: Result<(), InputError>) -> String {
    match result {
        Ok(()) => ok_json(),
        Err(e) => error_json(&e.to_string()),
    }
}

/// Local date as `YYYY-MM-DD`.
fn today_key() -> String {
    #[cfg(target_arch = "wasm32")]
    {
        let now = js_sys::Date::new_0();
        format!(
            "{:04}-{:02}-{:02}",
            now.get_full_year(),
            now.get_month() + 1,
            now.get_date()
        )
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        String::new()
    }
}

/// Install a panic hook that logs to the browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Scheme Board WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn canvas() -> SchemeCanvas {
        let mut canvas = SchemeCanvas::new(1280.0, 800.0);
        canvas.set_today("2024-05-01");
        canvas
    }

    #[test]
    fn add_card_reports_events() {
        let mut c = canvas();
        let id = c.add_card(false);
        let events: serde_json::Value = serde_json::from_str(&c.take_events_json()).unwrap();
        assert_eq!(events[0]["type"], "cardCreated");
        assert_eq!(events[0]["id"], id.as_str());
        assert_eq!(c.take_events_json(), "[]");
    }

    #[test]
    fn unknown_card_is_rejected() {
        let mut c = canvas();
        assert!(!c.toggle_lock("card_missing"));
        let reply: serde_json::Value =
            serde_json::from_str(&c.set_header_color("card_missing", "#fff")).unwrap();
        assert_eq!(reply["ok"], false);
        assert_eq!(c.get_card_json("card_missing"), "null");
    }

    #[test]
    fn load_project_reports_errors() {
        let mut c = canvas();
        let reply: serde_json::Value =
            serde_json::from_str(&c.load_project("<html></html>")).unwrap();
        assert_eq!(reply["ok"], false);
        assert_eq!(c.load_project(r#"{"cards":[],"lines":[]}"#), r#"{"ok":true}"#);
    }

    #[test]
    fn selection_json_tracks_clicks() {
        let mut c = canvas();
        let id = c.add_card(false);
        let dto: serde_json::Value = serde_json::from_str(&c.get_card_json(&id)).unwrap();
        let (x, y) = (dto["x"].as_f64().unwrap() as f32, dto["y"].as_f64().unwrap() as f32);
        assert_eq!(c.hit_test(x + 100.0, y + 100.0), id);

        c.handle_pointer_down(x + 100.0, y + 100.0, 0, false, true, false, false);
        c.handle_pointer_up(x + 100.0, y + 100.0, 0);
        let sel: serde_json::Value = serde_json::from_str(&c.get_selection_json()).unwrap();
        assert_eq!(sel["cards"][0], id.as_str());
    }

    #[test]
    fn print_size_reply() {
        let reply: serde_json::Value =
            serde_json::from_str(&print_size_pixels("150x120", 800, 600)).unwrap();
        assert_eq!(reply["ok"], true);
        assert_eq!(reply["width"], 8858);
        assert_eq!(reply["height"], 7087);

        let reply: serde_json::Value =
            serde_json::from_str(&print_size_pixels("big", 800, 600)).unwrap();
        assert_eq!(reply["ok"], false);
    }
}
