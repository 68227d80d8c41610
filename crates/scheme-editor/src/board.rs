//! The board engine: the single owner of cards, lines, view, selection and
//! history.
//!
//! Mutations come in two tiers. Primitives (`create_card`, `create_line`,
//! `delete_card`, `delete_line`, `move_card`) change the graph and emit
//! events but never touch history; the host or a gesture closes them with
//! one [`BoardEngine::commit`]. User-level actions (delete selection, paste,
//! template, decoration, PV buttons) commit on their own.

use crate::history::History;
use crate::selection::{MarqueeGate, Selection};
use crate::template;
use crate::tools::Gesture;
use scheme_core::error::{InputError, LoadError};
use scheme_core::geometry::{CanvasView, Point, Viewport, bottom_right_placement, snap_to_grid};
use scheme_core::graph::BoardGraph;
use scheme_core::id::{CardId, LineId};
use scheme_core::model::{
    Branch, CARD_HEIGHT, CARD_WIDTH, Card, Color, LARGE_CARD_WIDTH, Line, Note, Side, default_body,
};
use scheme_core::pv;
use scheme_core::snapshot::Snapshot;

// ─── Configuration ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub grid_size: f32,
    /// Pull-back of a line's end point from its target anchor.
    pub marker_offset: f32,
    pub history_limit: usize,
    /// Distance kept from the viewport edge by auto-placement.
    pub placement_padding: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Scale change per wheel delta unit.
    pub zoom_sensitivity: f32,
    pub paste_offset: f32,
    pub line_color: String,
    pub line_thickness: f32,
    pub marquee_gate: MarqueeGate,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            grid_size: 70.0,
            marker_offset: 12.0,
            history_limit: crate::history::HISTORY_LIMIT,
            placement_padding: 50.0,
            zoom_min: 0.1,
            zoom_max: 3.0,
            zoom_sensitivity: 0.001,
            paste_offset: 40.0,
            line_color: "#0f62fe".to_string(),
            line_thickness: 5.0,
            marquee_gate: MarqueeGate::SelectionMode,
        }
    }
}

/// Horizontal gap between a card's right edge and a freshly opened note.
const NOTE_GAP: f32 = 15.0;
/// Colors offered by the note window.
pub const NOTE_COLORS: [&str; 3] = ["#f44336", "#ffca28", "#42a5f5"];
const DIGEST_PREVIEW_CHARS: usize = 80;

// ─── Events ──────────────────────────────────────────────────────────────

/// Notifications for the host, drained after each call.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    CardCreated(CardId),
    CardDeleted(CardId),
    LineCreated(LineId),
    LineDeleted(LineId),
    /// A note window should be torn down.
    NoteClosed(CardId),
    /// The whole board was rebuilt from a snapshot.
    Restored,
    /// Something visible changed (notes availability included).
    Changed,
}

/// How a new card is placed and labelled.
#[derive(Debug, Clone, Default)]
pub struct CardOptions {
    /// Canvas position. `None` auto-places at the bottom-right of the view.
    pub position: Option<Point>,
    /// Skip grid snapping.
    pub free_position: bool,
    pub large: bool,
    pub title: Option<String>,
    /// Initial PV value, e.g. `"30/330pv"`.
    pub pv: Option<String>,
}

/// One row of the notes dropdown.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDigestEntry {
    pub card: CardId,
    /// `YYYY-MM-DD` key.
    pub date: String,
    /// `DD.MM.YYYY`.
    pub display_date: String,
    /// First line of the entry, at most 80 characters.
    pub preview: String,
    pub color: String,
}

/// A line being drawn from a connection point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDraft {
    pub start: CardId,
    pub side: Side,
    /// Pointer position in canvas space.
    pub pointer: Point,
}

// ─── Engine ──────────────────────────────────────────────────────────────

pub struct BoardEngine {
    pub(crate) graph: BoardGraph,
    pub(crate) view: CanvasView,
    pub(crate) viewport: Viewport,
    pub(crate) selection: Selection,
    pub(crate) history: History,
    pub(crate) config: BoardConfig,
    pub(crate) gesture: Gesture,
    pub(crate) draft: Option<LineDraft>,
    clipboard: Option<Snapshot>,
    /// Color and thickness used for new lines.
    line_color: String,
    line_thickness: f32,
    /// Line styling targets every line instead of the selected one.
    apply_to_all: bool,
    /// Today's `YYYY-MM-DD` key, supplied by the host.
    today: String,
    events: Vec<BoardEvent>,
}

impl BoardEngine {
    /// Empty board. History is seeded with the empty snapshot so the
    /// current state is always on top of the undo stack.
    pub fn new(config: BoardConfig, viewport: Viewport) -> Self {
        let mut engine = Self {
            graph: BoardGraph::new(),
            view: CanvasView::default(),
            viewport,
            selection: Selection::default(),
            history: History::new(config.history_limit),
            line_color: config.line_color.clone(),
            line_thickness: config.line_thickness,
            config,
            gesture: Gesture::Idle,
            draft: None,
            clipboard: None,
            apply_to_all: false,
            today: String::new(),
            events: Vec::new(),
        };
        engine.push_history();
        engine
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn graph(&self) -> &BoardGraph {
        &self.graph
    }

    pub fn view(&self) -> &CanvasView {
        &self.view
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn draft(&self) -> Option<&LineDraft> {
        self.draft.as_ref()
    }

    pub fn set_today(&mut self, today: &str) {
        self.today = today.to_string();
    }

    pub fn today(&self) -> &str {
        &self.today
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn drain_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: BoardEvent) {
        self.events.push(event);
    }

    // ─── Cards ───────────────────────────────────────────────────────────

    pub fn create_card(&mut self, options: CardOptions) -> CardId {
        let width = if options.large { LARGE_CARD_WIDTH } else { CARD_WIDTH };
        let raw = options.position.unwrap_or_else(|| {
            bottom_right_placement(
                &self.view,
                self.viewport,
                width,
                CARD_HEIGHT,
                self.config.placement_padding,
            )
        });
        let position = if options.free_position {
            raw
        } else {
            Point::new(
                snap_to_grid(raw.x, self.config.grid_size),
                snap_to_grid(raw.y, self.config.grid_size),
            )
        };

        let id = CardId::generate();
        let mut card = Card::new(id, position);
        if options.large {
            card.width = LARGE_CARD_WIDTH;
            card.explicit_width = true;
        }
        if let Some(title) = options.title {
            card.title = title;
        }
        if let Some(pv) = options.pv {
            card.body = default_body(&pv);
        }
        self.graph.insert_card(card);
        log::debug!("card created: {id} at ({}, {})", position.x, position.y);
        self.emit(BoardEvent::CardCreated(id));
        self.emit(BoardEvent::Changed);
        id
    }

    /// Toolbar "add card": create and commit.
    pub fn add_card(&mut self, options: CardOptions) -> CardId {
        let id = self.create_card(options);
        self.commit();
        id
    }

    /// Remove a card and its incident lines. Closes its note window and
    /// drops it from the selection.
    pub fn delete_card(&mut self, id: CardId) -> bool {
        let Some((card, lines)) = self.graph.remove_card(id) else {
            return false;
        };
        self.selection.forget_card(id);
        for line in &lines {
            self.selection.forget_line(*line);
            self.emit(BoardEvent::LineDeleted(*line));
        }
        if card.note.as_ref().is_some_and(|n| n.visible) {
            self.emit(BoardEvent::NoteClosed(id));
        }
        if self.draft.is_some_and(|d| d.start == id) {
            self.draft = None;
        }
        log::debug!("card deleted: {id} ({} lines cascaded)", lines.len());
        self.emit(BoardEvent::CardDeleted(id));
        self.emit(BoardEvent::Changed);
        true
    }

    /// Set a card's position. A visible note follows by the same on-screen
    /// delta. Incident line paths are routed from live bounds, so they
    /// follow without further bookkeeping.
    pub fn move_card(&mut self, id: CardId, position: Point) -> bool {
        let scale = self.view.scale;
        let Some(card) = self.graph.card_mut(id) else {
            return false;
        };
        let (dx, dy) = (position.x - card.position.x, position.y - card.position.y);
        card.position = position;
        if let Some(note) = card.note.as_mut().filter(|n| n.visible) {
            note.x += dx * scale;
            note.y += dy * scale;
        }
        log::trace!("card moved: {id} to ({}, {})", position.x, position.y);
        true
    }

    // ─── Lines ───────────────────────────────────────────────────────────

    /// Connect two cards. `None` (nothing created) on a self-loop or a
    /// missing card.
    pub fn create_line(
        &mut self,
        start: CardId,
        start_side: Side,
        end: CardId,
        end_side: Side,
        color: &str,
        thickness: f32,
    ) -> Option<LineId> {
        let id = LineId::generate();
        let line = Line {
            id,
            start,
            start_side,
            end,
            end_side,
            color: color.to_string(),
            thickness,
        };
        if !self.graph.insert_line(line) {
            log::debug!("line rejected: {start} -> {end}");
            return None;
        }
        log::debug!("line created: {id} {start}.{} -> {end}.{}", start_side.as_str(), end_side.as_str());
        self.emit(BoardEvent::LineCreated(id));
        Some(id)
    }

    pub fn delete_line(&mut self, id: LineId) -> bool {
        if self.graph.remove_line(id).is_none() {
            return false;
        }
        self.selection.forget_line(id);
        log::debug!("line deleted: {id}");
        self.emit(BoardEvent::LineDeleted(id));
        true
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select a line. Its style becomes the style for new lines.
    pub fn select_line(&mut self, id: LineId) -> bool {
        let Some(line) = self.graph.line(id) else {
            return false;
        };
        self.line_color = line.color.clone();
        self.line_thickness = line.thickness;
        self.selection.select_line(id);
        true
    }

    pub fn toggle_card_selection(&mut self, id: CardId) -> bool {
        if !self.graph.contains_card(id) {
            return false;
        }
        self.selection.toggle_card(id);
        true
    }

    pub fn set_selection_mode(&mut self, on: bool) {
        self.selection.mode = on;
    }

    /// Cancel line drawing, selection mode, any marquee, and every selection.
    pub fn escape(&mut self) {
        self.draft = None;
        self.gesture = Gesture::Idle;
        self.selection.clear_all();
    }

    /// Delete every selected card and the selected line. Commits once, and
    /// only if something was removed.
    pub fn delete_selection(&mut self) -> bool {
        let cards: Vec<CardId> = self.selection.cards().to_vec();
        let mut changed = false;
        for id in cards {
            changed |= self.delete_card(id);
        }
        if let Some(line) = self.selection.line() {
            changed |= self.delete_line(line);
        }
        if changed {
            self.commit();
        }
        changed
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.view.pan_by(dx, dy);
    }

    /// Wheel zoom: the scale changes additively by `-delta_y` times the
    /// sensitivity, anchored at the pointer.
    pub fn zoom_wheel(&mut self, anchor: Point, delta_y: f32) {
        let target = self.view.scale - delta_y * self.config.zoom_sensitivity;
        self.view
            .zoom_at(anchor, target, self.config.zoom_min, self.config.zoom_max);
        log::trace!("zoom: scale {}", self.view.scale);
    }

    pub fn set_view(&mut self, view: CanvasView) {
        self.view = view;
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Close an undoable action: recalculate derived PV values and push the
    /// current state.
    pub fn commit(&mut self) {
        self.recalculate();
        self.push_history();
        self.emit(BoardEvent::Changed);
    }

    fn push_history(&mut self) {
        let snapshot = Snapshot::capture(&self.graph);
        if let Err(e) = self.history.commit(&snapshot) {
            log::warn!("history commit failed: {e}");
        }
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                log::debug!("undo");
                self.load_state(&snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                log::debug!("redo");
                self.load_state(&snapshot);
                true
            }
            None => false,
        }
    }

    /// Replace the whole board with a snapshot. Selection, drawing and
    /// gestures are dropped. History is not touched.
    pub fn load_state(&mut self, snapshot: &Snapshot) {
        for card in self.graph.cards() {
            if card.note.as_ref().is_some_and(|n| n.visible) {
                self.events.push(BoardEvent::NoteClosed(card.id));
            }
        }
        self.graph = snapshot.restore(&self.today);
        self.selection.clear_all();
        self.draft = None;
        self.gesture = Gesture::Idle;
        self.recalculate();
        self.emit(BoardEvent::Restored);
        self.emit(BoardEvent::Changed);
    }

    fn recalculate(&mut self) {
        let parents = pv::build_parent_map(&self.graph);
        pv::recalculate(&mut self.graph, &parents);
    }

    // ─── Project file ────────────────────────────────────────────────────

    /// Load a project file and commit it. On error the board is untouched.
    pub fn load_project(&mut self, text: &str) -> Result<(), LoadError> {
        let snapshot = Snapshot::from_project_file(text).inspect_err(|e| {
            log::warn!("project load failed: {e}");
        })?;
        self.load_state(&snapshot);
        self.commit();
        log::debug!(
            "project loaded: {} cards, {} lines",
            self.graph.cards().len(),
            self.graph.lines().len()
        );
        Ok(())
    }

    pub fn save_project(&self) -> String {
        Snapshot::capture(&self.graph).to_json_pretty()
    }

    // ─── Clipboard ───────────────────────────────────────────────────────

    /// Copy the selected cards and the lines between them. Returns how many
    /// cards were copied; an empty selection leaves the clipboard alone.
    pub fn copy(&mut self) -> usize {
        let selected = self.selection.cards();
        if selected.is_empty() {
            return 0;
        }
        let full = Snapshot::capture(&self.graph);
        let names: Vec<&str> = selected.iter().map(CardId::as_str).collect();
        let cards: Vec<_> = full
            .cards
            .into_iter()
            .filter(|c| names.contains(&c.id.as_str()))
            .collect();
        let lines = full
            .lines
            .into_iter()
            .filter(|l| names.contains(&l.start_id.as_str()) && names.contains(&l.end_id.as_str()))
            .collect();
        let copied = cards.len();
        self.clipboard = Some(Snapshot { cards, lines });
        log::debug!("copied {copied} cards");
        copied
    }

    /// Paste the clipboard offset by the paste offset, with fresh ids.
    /// The pasted cards become the selection. Commits once.
    pub fn paste(&mut self) -> Vec<CardId> {
        let Some(clip) = self.clipboard.clone().filter(|c| !c.cards.is_empty()) else {
            return Vec::new();
        };
        let offset = self.config.paste_offset;
        let mut mapping: Vec<(&str, CardId)> = Vec::with_capacity(clip.cards.len());
        for dto in &clip.cards {
            let id = CardId::generate();
            let mut card = dto.to_card(id, &self.today);
            card.position = Point::new(card.position.x + offset, card.position.y + offset);
            if let Some(note) = card.note.as_mut() {
                note.x += offset;
                note.y += offset;
                note.visible = false;
            }
            if self.graph.insert_card(card) {
                mapping.push((dto.id.as_str(), id));
                self.emit(BoardEvent::CardCreated(id));
            }
        }
        let resolve = |name: &str| mapping.iter().find(|(k, _)| *k == name).map(|(_, id)| *id);
        for dto in &clip.lines {
            let (Some(start), Some(end)) = (resolve(&dto.start_id), resolve(&dto.end_id)) else {
                continue;
            };
            self.create_line(start, dto.start_side, end, dto.end_side, &dto.color, dto.thickness);
        }
        let ids: Vec<CardId> = mapping.into_iter().map(|(_, id)| id).collect();
        self.selection.set_cards(ids.iter().copied());
        log::debug!("pasted {} cards", ids.len());
        self.commit();
        ids
    }

    // ─── Template ────────────────────────────────────────────────────────

    /// Insert the starter tree at the bottom-right of the view. Commits.
    pub fn load_template(&mut self) -> Vec<CardId> {
        let bounds = template::template_bounds();
        let origin = bottom_right_placement(
            &self.view,
            self.viewport,
            bounds.width,
            bounds.height,
            self.config.placement_padding,
        );
        let ids = template::instantiate(&mut self.graph, origin);
        for id in &ids {
            self.events.push(BoardEvent::CardCreated(*id));
        }
        self.commit();
        ids
    }

    // ─── Card decoration ─────────────────────────────────────────────────

    /// Apply `f` to a card and commit. `false` if the card is missing.
    fn edit_card(&mut self, id: CardId, f: impl FnOnce(&mut Card)) -> bool {
        let Some(card) = self.graph.card_mut(id) else {
            return false;
        };
        f(card);
        self.commit();
        true
    }

    pub fn toggle_lock(&mut self, id: CardId) -> bool {
        self.edit_card(id, |c| c.locked = !c.locked)
    }

    pub fn cycle_header_color(&mut self, id: CardId) -> bool {
        self.edit_card(id, Card::cycle_header_color)
    }

    pub fn set_header_color(&mut self, id: CardId, color: &str) -> Result<(), InputError> {
        if Color::parse(color).is_none() {
            log::warn!("rejected header color {color:?}");
            return Err(InputError::Color(color.to_string()));
        }
        if !self.edit_card(id, |c| c.header_bg = color.to_string()) {
            return Err(InputError::UnknownCard(id.to_string()));
        }
        Ok(())
    }

    pub fn toggle_dark_mode(&mut self, id: CardId) -> bool {
        self.edit_card(id, |c| c.dark_mode = !c.dark_mode)
    }

    /// Locked cards keep their text.
    pub fn set_title(&mut self, id: CardId, title: &str) -> bool {
        if self.graph.card(id).is_none_or(|c| c.locked) {
            return false;
        }
        self.edit_card(id, |c| c.title = title.to_string())
    }

    pub fn set_row_value(&mut self, id: CardId, row: usize, value: &str) -> bool {
        let editable = self
            .graph
            .card(id)
            .is_some_and(|c| !c.locked && row < c.body.len());
        if !editable {
            return false;
        }
        self.edit_card(id, |c| c.body[row].value = value.to_string())
    }

    // ─── PV buttons ──────────────────────────────────────────────────────

    /// `+step` on a card's branch, carrying overflow up the tree. Commits.
    pub fn increment_pv(&mut self, id: CardId, branch: Branch, step: u32) -> bool {
        let parents = pv::build_parent_map(&self.graph);
        match pv::increment(&mut self.graph, &parents, id, branch, step) {
            Some(carries) => {
                log::debug!("pv +{step} on {id} ({branch:?}): {} carries", carries.len());
                self.commit();
                true
            }
            None => false,
        }
    }

    pub fn clear_pv(&mut self, id: CardId) -> bool {
        if !pv::clear(&mut self.graph, id) {
            return false;
        }
        self.commit();
        true
    }

    // ─── Line styling ────────────────────────────────────────────────────

    pub fn line_style(&self) -> (&str, f32) {
        (&self.line_color, self.line_thickness)
    }

    pub fn apply_to_all(&self) -> bool {
        self.apply_to_all
    }

    pub fn set_apply_to_all(&mut self, on: bool) {
        self.apply_to_all = on;
    }

    /// Lines the styling controls act on.
    fn styled_lines(&self) -> Vec<LineId> {
        if self.apply_to_all {
            self.graph.lines().iter().map(|l| l.id).collect()
        } else {
            self.selection.line().into_iter().collect()
        }
    }

    /// Set the line color and commit. Returns how many lines changed.
    pub fn set_line_color(&mut self, color: &str) -> Result<usize, InputError> {
        if Color::parse(color).is_none() {
            return Err(InputError::Color(color.to_string()));
        }
        self.line_color = color.to_string();
        let targets = self.styled_lines();
        for id in &targets {
            if let Some(line) = self.graph.line_mut(*id) {
                line.color = color.to_string();
            }
        }
        self.commit();
        Ok(targets.len())
    }

    /// Live thickness while the slider moves. No commit.
    pub fn preview_line_thickness(&mut self, thickness: f32) -> usize {
        if !thickness.is_finite() || thickness <= 0.0 {
            return 0;
        }
        self.line_thickness = thickness;
        let targets = self.styled_lines();
        for id in &targets {
            if let Some(line) = self.graph.line_mut(*id) {
                line.thickness = thickness;
            }
        }
        targets.len()
    }

    /// Final thickness when the slider is released. Commits unless the
    /// value is rejected.
    pub fn set_line_thickness(&mut self, thickness: f32) -> usize {
        if !thickness.is_finite() || thickness <= 0.0 {
            log::warn!("ignoring line thickness {thickness}");
            return 0;
        }
        let n = self.preview_line_thickness(thickness);
        self.commit();
        n
    }

    // ─── Notes ───────────────────────────────────────────────────────────

    /// Screen position for a note opened next to `card`.
    fn note_anchor(&self, card: &Card) -> Point {
        let b = self.view.bounds_to_screen(&card.bounds());
        Point::new(b.right() + NOTE_GAP, b.y)
    }

    /// Open or close a card's note window, creating the note on first use.
    /// Returns the new visibility. Commits.
    pub fn toggle_note(&mut self, id: CardId) -> Option<bool> {
        let anchor = self.note_anchor(self.graph.card(id)?);
        let today = self.today.clone();
        let card = self.graph.card_mut(id)?;
        let note = card
            .note
            .get_or_insert_with(|| Note::new(anchor.x, anchor.y, &today));
        note.ensure_structure(&today);
        note.visible = !note.visible;
        let visible = note.visible;
        if !visible {
            self.emit(BoardEvent::NoteClosed(id));
        }
        self.commit();
        Some(visible)
    }

    pub fn close_note(&mut self, id: CardId) -> bool {
        let Some(note) = self.graph.card_mut(id).and_then(|c| c.note.as_mut()) else {
            return false;
        };
        if !note.visible {
            return false;
        }
        note.visible = false;
        self.emit(BoardEvent::NoteClosed(id));
        self.commit();
        true
    }

    /// Live text edit for one date. Blank text removes the entry. The host
    /// commits when the text area loses focus.
    pub fn set_note_entry(&mut self, id: CardId, date: &str, text: &str) -> bool {
        let Some(note) = self.graph.card_mut(id).and_then(|c| c.note.as_mut()) else {
            return false;
        };
        note.set_entry(date, text);
        self.emit(BoardEvent::Changed);
        true
    }

    /// Color the note's selected date. Commits.
    pub fn set_note_color(&mut self, id: CardId, color: &str) -> Result<(), InputError> {
        if Color::parse(color).is_none() {
            return Err(InputError::Color(color.to_string()));
        }
        let Some(note) = self.graph.card_mut(id).and_then(|c| c.note.as_mut()) else {
            return Err(InputError::UnknownCard(id.to_string()));
        };
        note.colors
            .insert(note.selected_date.clone(), color.to_string());
        self.commit();
        Ok(())
    }

    pub fn select_note_date(&mut self, id: CardId, date: &str) -> bool {
        let Some(note) = self.graph.card_mut(id).and_then(|c| c.note.as_mut()) else {
            return false;
        };
        note.selected_date = date.to_string();
        true
    }

    pub fn resize_note(&mut self, id: CardId, width: f32, height: f32) -> bool {
        let Some(note) = self.graph.card_mut(id).and_then(|c| c.note.as_mut()) else {
            return false;
        };
        note.resize(width, height);
        true
    }

    /// Note window dragged by its header. Commits.
    pub fn move_note(&mut self, id: CardId, x: f32, y: f32) -> bool {
        let Some(note) = self.graph.card_mut(id).and_then(|c| c.note.as_mut()) else {
            return false;
        };
        note.x = x;
        note.y = y;
        self.commit();
        true
    }

    /// Hide every open note that has no text. Not an undoable action.
    pub fn close_empty_notes(&mut self) -> Vec<CardId> {
        let mut closed = Vec::new();
        for card in self.graph.cards_mut() {
            if let Some(note) = card.note.as_mut().filter(|n| n.visible && !n.has_any_entry()) {
                note.visible = false;
                closed.push(card.id);
            }
        }
        for id in &closed {
            self.events.push(BoardEvent::NoteClosed(*id));
        }
        closed
    }

    /// Whether the notes dropdown has anything to list.
    pub fn notes_available(&self) -> bool {
        self.graph.cards().iter().any(Card::has_note_entries)
    }

    /// Every non-blank note entry on the board, newest date first.
    pub fn note_digest(&self) -> Vec<NoteDigestEntry> {
        let mut items: Vec<NoteDigestEntry> = self
            .graph
            .cards()
            .iter()
            .filter_map(|c| c.note.as_ref().map(|n| (c.id, n)))
            .flat_map(|(card, note)| {
                note.entries.iter().filter_map(move |(date, text)| {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        return None;
                    }
                    let first = trimmed.lines().next().unwrap_or_default();
                    Some(NoteDigestEntry {
                        card,
                        date: date.clone(),
                        display_date: display_date(date),
                        preview: first.chars().take(DIGEST_PREVIEW_CHARS).collect(),
                        color: note.color_for(date).to_string(),
                    })
                })
            })
            .collect();
        items.sort_by(|a, b| b.date.cmp(&a.date));
        items
    }

    /// Open a note at a digest entry's date, next to its card. Commits.
    pub fn open_note_at(&mut self, id: CardId, date: &str) -> bool {
        let Some(anchor) = self.graph.card(id).map(|c| self.note_anchor(c)) else {
            return false;
        };
        let today = self.today.clone();
        let Some(card) = self.graph.card_mut(id) else {
            return false;
        };
        let note = card
            .note
            .get_or_insert_with(|| Note::new(anchor.x, anchor.y, &today));
        note.ensure_structure(&today);
        note.selected_date = date.to_string();
        note.x = anchor.x;
        note.y = anchor.y;
        note.visible = true;
        self.commit();
        true
    }

    /// Delete one dated entry from the digest. Commits.
    pub fn delete_note_entry(&mut self, id: CardId, date: &str) -> bool {
        let removed = self
            .graph
            .card_mut(id)
            .and_then(|c| c.note.as_mut())
            .and_then(|n| n.entries.remove(date))
            .is_some();
        if removed {
            self.commit();
        }
        removed
    }
}

/// `2024-05-01` → `01.05.2024`.
fn display_date(key: &str) -> String {
    key.split('-').rev().collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> BoardEngine {
        let mut e = BoardEngine::new(BoardConfig::default(), Viewport::default());
        e.set_today("2024-05-01");
        e
    }

    fn at(x: f32, y: f32) -> CardOptions {
        CardOptions {
            position: Some(Point::new(x, y)),
            ..CardOptions::default()
        }
    }

    #[test]
    fn create_card_snaps_unless_free() {
        let mut e = engine();
        let a = e.create_card(at(100.0, 40.0));
        assert_eq!(e.graph().card(a).unwrap().position, Point::new(70.0, 70.0));
        let b = e.create_card(CardOptions {
            free_position: true,
            ..at(100.0, 40.0)
        });
        assert_eq!(e.graph().card(b).unwrap().position, Point::new(100.0, 40.0));
    }

    #[test]
    fn auto_placement_is_bottom_right() {
        let mut e = engine();
        let id = e.create_card(CardOptions {
            free_position: true,
            ..CardOptions::default()
        });
        // 1280 - 380 - 50, 800 - 280 - 50
        assert_eq!(e.graph().card(id).unwrap().position, Point::new(850.0, 470.0));
    }

    #[test]
    fn zoom_is_clamped_and_anchored() {
        let mut e = engine();
        e.zoom_wheel(Point::new(100.0, 100.0), -500.0);
        assert!((e.view().scale - 1.5).abs() < 1e-6);
        assert!((e.view().x - -50.0).abs() < 1e-4);
        e.zoom_wheel(Point::new(0.0, 0.0), -100_000.0);
        assert_eq!(e.view().scale, 3.0);
        e.zoom_wheel(Point::new(0.0, 0.0), 100_000.0);
        assert!((e.view().scale - 0.1).abs() < 1e-6);
    }

    #[test]
    fn line_color_targets_selected_or_all() {
        let mut e = engine();
        let a = e.create_card(at(0.0, 0.0));
        let b = e.create_card(at(0.0, 700.0));
        let c = e.create_card(at(700.0, 700.0));
        let l1 = e.create_line(a, Side::Bottom, b, Side::Top, "#0f62fe", 5.0).unwrap();
        let l2 = e.create_line(a, Side::Right, c, Side::Top, "#0f62fe", 5.0).unwrap();

        assert_eq!(e.set_line_color("#112233"), Ok(0));
        assert!(e.select_line(l1));
        assert_eq!(e.set_line_color("#112233"), Ok(1));
        assert_eq!(e.graph().line(l2).unwrap().color, "#0f62fe");

        e.set_apply_to_all(true);
        assert_eq!(e.set_line_thickness(8.0), 2);
        assert!(e.graph().lines().iter().all(|l| l.thickness == 8.0));

        assert_eq!(
            e.set_line_color("blue-ish"),
            Err(InputError::Color("blue-ish".into()))
        );
    }

    #[test]
    fn preview_thickness_does_not_commit() {
        let mut e = engine();
        let a = e.create_card(at(0.0, 0.0));
        let b = e.create_card(at(0.0, 700.0));
        let l = e.create_line(a, Side::Bottom, b, Side::Top, "#0f62fe", 5.0).unwrap();
        e.commit();
        let depth = e.history.undo_depth();
        e.select_line(l);
        e.preview_line_thickness(9.0);
        assert_eq!(e.history.undo_depth(), depth);
        assert_eq!(e.graph().line(l).unwrap().thickness, 9.0);
    }

    #[test]
    fn locked_card_keeps_title() {
        let mut e = engine();
        let a = e.create_card(at(0.0, 0.0));
        e.toggle_lock(a);
        assert!(!e.set_title(a, "new"));
        e.toggle_lock(a);
        assert!(e.set_title(a, "new"));
        assert_eq!(e.graph().card(a).unwrap().title, "new");
    }

    #[test]
    fn header_color_is_validated() {
        let mut e = engine();
        let a = e.create_card(at(0.0, 0.0));
        assert!(e.set_header_color(a, "rgb(10, 20, 30)").is_ok());
        assert_eq!(
            e.set_header_color(a, "#12"),
            Err(InputError::Color("#12".into()))
        );
        assert_eq!(e.graph().card(a).unwrap().header_bg, "rgb(10, 20, 30)");
    }

    #[test]
    fn note_opens_beside_card() {
        let mut e = engine();
        let a = e.create_card(at(140.0, 70.0));
        assert_eq!(e.toggle_note(a), Some(true));
        let note = e.graph().card(a).unwrap().note.clone().unwrap();
        assert_eq!((note.x, note.y), (140.0 + 380.0 + 15.0, 70.0));
        assert_eq!(note.selected_date, "2024-05-01");

        e.drain_events();
        assert_eq!(e.close_empty_notes(), vec![a]);
        assert_eq!(e.drain_events(), vec![BoardEvent::NoteClosed(a)]);
    }

    #[test]
    fn digest_is_sorted_and_trimmed() {
        let mut e = engine();
        let a = e.create_card(at(0.0, 0.0));
        let b = e.create_card(at(700.0, 0.0));
        e.toggle_note(a);
        e.toggle_note(b);
        e.set_note_entry(a, "2024-03-02", "  first line\nsecond");
        e.set_note_entry(b, "2024-04-10", &"x".repeat(120));
        e.set_note_entry(b, "2024-01-01", "   ");
        assert!(e.notes_available());

        let digest = e.note_digest();
        assert_eq!(digest.len(), 2);
        assert_eq!(digest[0].card, b);
        assert_eq!(digest[0].display_date, "10.04.2024");
        assert_eq!(digest[0].preview.chars().count(), 80);
        assert_eq!(digest[1].preview, "first line");
        assert_eq!(digest[1].color, "#f44336");

        assert!(e.delete_note_entry(b, "2024-04-10"));
        assert_eq!(e.note_digest().len(), 1);
    }

    #[test]
    fn copy_paste_offsets_and_reselects() {
        let mut e = engine();
        let a = e.create_card(at(0.0, 0.0));
        let b = e.create_card(at(0.0, 700.0));
        let c = e.create_card(at(700.0, 700.0));
        e.create_line(a, Side::Bottom, b, Side::Top, "#0f62fe", 5.0);
        e.create_line(a, Side::Right, c, Side::Top, "#0f62fe", 5.0);
        e.toggle_note(a);
        e.selection.set_cards([a, b]);

        assert_eq!(e.copy(), 2);
        let pasted = e.paste();
        assert_eq!(pasted.len(), 2);
        assert_eq!(e.graph().cards().len(), 5);
        // Only the a–b line is internal to the copy.
        assert_eq!(e.graph().lines().len(), 3);
        assert_eq!(e.selection().cards(), pasted.as_slice());

        let copy_of_a = e.graph().card(pasted[0]).unwrap();
        assert_eq!(copy_of_a.position, Point::new(40.0, 40.0));
        let note = copy_of_a.note.as_ref().unwrap();
        assert!(!note.visible);
        assert_eq!(note.x, 0.0 + 380.0 + 15.0 + 40.0);
    }

    #[test]
    fn paste_with_empty_clipboard_is_noop() {
        let mut e = engine();
        assert!(e.paste().is_empty());
        assert!(!e.can_undo());
    }

    #[test]
    fn template_lands_bottom_right() {
        let mut e = engine();
        let ids = e.load_template();
        assert_eq!(ids.len(), 7);
        let b = e.graph().content_bounds().unwrap();
        // Wider than the viewport, so it clamps to the top-left padding.
        assert_eq!((b.x, b.y), (50.0, 50.0));
        assert!(e.can_undo());
    }

    #[test]
    fn pv_buttons_commit_and_recalculate() {
        let mut e = engine();
        let parent = e.create_card(at(700.0, 0.0));
        let child = e.create_card(at(0.0, 700.0));
        e.create_line(parent, Side::Left, child, Side::Top, "#0f62fe", 5.0);
        e.commit();

        assert!(e.increment_pv(child, Branch::Left, 330));
        let p = e.graph().card(parent).unwrap();
        assert_eq!(p.active.carry_bonus_left, 1);
        // One full child on the left plus one carried unit.
        assert_eq!(
            p.row(scheme_core::model::RowKind::Balance).map(|r| r.value.as_str()),
            Some("2 / 0")
        );
        assert!(e.clear_pv(child));
        assert_eq!(e.graph().card(child).unwrap().active.local_overflow_left, 0);
    }

    #[test]
    fn display_date_reverses_parts() {
        assert_eq!(display_date("2024-12-31"), "31.12.2024");
    }
}
