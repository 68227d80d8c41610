//! Board data model: cards, lines, notes, and the active-PV side-state.
//!
//! Everything here is plain data. Cards own their body rows and optional
//! note; lines reference cards by [`CardId`] and never own them. Rendering
//! is a projection of these records and lives in other crates.

use crate::body;
use crate::geometry::{Bounds, Point};
use crate::id::{CardId, LineId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default card width in canvas units.
pub const CARD_WIDTH: f32 = 380.0;
/// Width of a "large" card (the tree root in the starter template).
pub const LARGE_CARD_WIDTH: f32 = 494.0;
/// Card height used for anchors and hit testing.
pub const CARD_HEIGHT: f32 = 280.0;

/// Header palette cycled by the color-changer dot.
pub const HEADER_PALETTE: [&str; 4] = ["#5D8BF4", "#38A3A5", "#E87A5D", "#595959"];

pub const COIN_FULL: &str = "#ffd700";
pub const COIN_EMPTY: &str = "#3d85c6";

// ─── Colors ──────────────────────────────────────────────────────────────

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse any CSS color the board stores: `#RGB`, `#RRGGBB`,
    /// `#RRGGBBAA`, or `rgb(r, g, b)` / `rgba(r, g, b, a)`.
    pub fn parse(s: &str) -> Option<Self> {
        body::parse_css_color(s)
    }

    /// Emit as lowercase `#rrggbb` (or `#rrggbbaa` when translucent).
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

// ─── Sides and branches ──────────────────────────────────────────────────

/// One of the four connection anchors on a card's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
            Side::Left => "left",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "top" => Some(Side::Top),
            "right" => Some(Side::Right),
            "bottom" => Some(Side::Bottom),
            "left" => Some(Side::Left),
            _ => None,
        }
    }
}

/// Left or right leg of the binary PV tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl Branch {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "L" | "l" | "left" => Some(Branch::Left),
            "R" | "r" | "right" => Some(Branch::Right),
            _ => None,
        }
    }
}

/// A left/right pair of counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pair {
    pub left: u32,
    pub right: u32,
}

impl Pair {
    pub const fn new(left: u32, right: u32) -> Self {
        Self { left, right }
    }

    pub fn get(&self, branch: Branch) -> u32 {
        match branch {
            Branch::Left => self.left,
            Branch::Right => self.right,
        }
    }

    pub fn get_mut(&mut self, branch: Branch) -> &mut u32 {
        match branch {
            Branch::Left => &mut self.left,
            Branch::Right => &mut self.right,
        }
    }
}

// ─── Card body ───────────────────────────────────────────────────────────

/// What a body row means to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowKind {
    /// Coin icon plus `current/targetpv` progress.
    Pv,
    /// Derived `L / R` balance (written by the PV engine).
    Balance,
    /// Manually incremented `L / R` active-orders counters.
    ActiveOrders,
    /// Derived cycle count.
    Cycle,
    Custom,
}

impl RowKind {
    /// Classify a row by its label text (Russian or English).
    pub fn from_label(label: &str) -> Self {
        let l = label.trim().to_lowercase();
        if l.starts_with("баланс") || l.starts_with("balance") {
            RowKind::Balance
        } else if l.starts_with("актив-заказы") || l.starts_with("active orders") {
            RowKind::ActiveOrders
        } else if l.starts_with("цикл") || l.starts_with("cycle") {
            RowKind::Cycle
        } else {
            RowKind::Custom
        }
    }
}

/// One label/value line in a card body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyRow {
    pub kind: RowKind,
    pub label: String,
    pub value: String,
}

impl BodyRow {
    pub fn new(kind: RowKind, label: &str, value: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// Rows of a freshly created card.
pub fn default_body(pv: &str) -> Vec<BodyRow> {
    vec![
        BodyRow::new(RowKind::Pv, "", pv),
        BodyRow::new(RowKind::Balance, "Баланс:", "0 / 0"),
        BodyRow::new(RowKind::ActiveOrders, "Актив-заказы PV:", "0 / 0"),
        BodyRow::new(RowKind::Cycle, "Цикл:", "0"),
    ]
}

// ─── Active PV side-state ────────────────────────────────────────────────

/// Hidden per-card counters owned by the PV engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePvState {
    pub button_left: u32,
    pub button_right: u32,
    pub carry_bonus_left: u32,
    pub carry_bonus_right: u32,
    pub local_overflow_left: u32,
    pub local_overflow_right: u32,
}

impl ActivePvState {
    pub fn buttons(&self) -> Pair {
        Pair::new(self.button_left, self.button_right)
    }

    pub fn carry_bonus(&self) -> Pair {
        Pair::new(self.carry_bonus_left, self.carry_bonus_right)
    }

    pub fn local_overflow(&self) -> Pair {
        Pair::new(self.local_overflow_left, self.local_overflow_right)
    }

    pub fn add_button(&mut self, branch: Branch, n: u32) {
        match branch {
            Branch::Left => self.button_left = self.button_left.saturating_add(n),
            Branch::Right => self.button_right = self.button_right.saturating_add(n),
        }
    }

    pub fn add_carry_bonus(&mut self, branch: Branch, n: u32) {
        match branch {
            Branch::Left => self.carry_bonus_left = self.carry_bonus_left.saturating_add(n),
            Branch::Right => self.carry_bonus_right = self.carry_bonus_right.saturating_add(n),
        }
    }

    pub fn add_local_overflow(&mut self, branch: Branch, n: u32) {
        match branch {
            Branch::Left => self.local_overflow_left = self.local_overflow_left.saturating_add(n),
            Branch::Right => self.local_overflow_right = self.local_overflow_right.saturating_add(n),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

// ─── Notes ───────────────────────────────────────────────────────────────

pub const NOTE_MIN_SIZE: f32 = 200.0;
pub const NOTE_DEFAULT_WIDTH: f32 = 260.0;
pub const NOTE_DEFAULT_HEIGHT: f32 = 380.0;
pub const NOTE_DEFAULT_HIGHLIGHT: &str = "#f44336";

/// A dated note attached to a card. Position/size are in screen pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_note_width")]
    pub width: f32,
    #[serde(default = "default_note_height")]
    pub height: f32,
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    #[serde(default)]
    pub selected_date: String,
    #[serde(default = "default_highlight")]
    pub highlight_color: String,
    /// Single-text notes from older files; folded into `entries`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn default_note_width() -> f32 {
    NOTE_DEFAULT_WIDTH
}

fn default_note_height() -> f32 {
    NOTE_DEFAULT_HEIGHT
}

fn default_highlight() -> String {
    NOTE_DEFAULT_HIGHLIGHT.to_string()
}

impl Note {
    pub fn new(x: f32, y: f32, today: &str) -> Self {
        Self {
            visible: false,
            x,
            y,
            width: NOTE_DEFAULT_WIDTH,
            height: NOTE_DEFAULT_HEIGHT,
            entries: BTreeMap::new(),
            colors: BTreeMap::new(),
            selected_date: today.to_string(),
            highlight_color: default_highlight(),
            text: None,
        }
    }

    /// True when at least one entry has non-whitespace text.
    pub fn has_any_entry(&self) -> bool {
        if self.entries.values().any(|v| !v.trim().is_empty()) {
            return true;
        }
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Fill defaults and migrate a legacy single `text` into the entry map.
    pub fn ensure_structure(&mut self, today: &str) {
        if self.selected_date.is_empty() {
            self.selected_date = today.to_string();
        }
        if self.highlight_color.is_empty() {
            self.highlight_color = default_highlight();
        }
        if let Some(text) = self.text.take()
            && !text.trim().is_empty()
        {
            self.entries
                .entry(self.selected_date.clone())
                .or_insert(text);
        }
    }

    /// Set the text for a date. Blank text removes the entry.
    pub fn set_entry(&mut self, date: &str, text: &str) {
        if text.trim().is_empty() {
            self.entries.remove(date);
        } else {
            self.entries.insert(date.to_string(), text.to_string());
        }
    }

    pub fn entry(&self, date: &str) -> Option<&str> {
        self.entries.get(date).map(String::as_str)
    }

    /// Color shown for a date: its own color, else the highlight color.
    pub fn color_for(&self, date: &str) -> &str {
        self.colors
            .get(date)
            .map(String::as_str)
            .unwrap_or(&self.highlight_color)
    }

    /// Color of the card's note button: the selected date's color, shown
    /// only while the note has text.
    pub fn indicator_color(&self) -> Option<&str> {
        self.has_any_entry()
            .then(|| self.color_for(&self.selected_date))
    }

    /// Resize, ignoring dimensions below the minimum window size.
    pub fn resize(&mut self, width: f32, height: f32) {
        if width.is_finite() && width >= NOTE_MIN_SIZE {
            self.width = width;
        }
        if height.is_finite() && height >= NOTE_MIN_SIZE {
            self.height = height;
        }
    }
}

// ─── Cards and lines ─────────────────────────────────────────────────────

/// A draggable card on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub position: Point,
    pub width: f32,
    pub height: f32,
    /// Whether `width` was set explicitly (serialized as a CSS width).
    pub explicit_width: bool,
    pub locked: bool,
    pub title: String,
    pub body: Vec<BodyRow>,
    pub dark_mode: bool,
    pub body_class: String,
    pub header_bg: String,
    pub color_index: usize,
    pub coin_full: bool,
    pub note: Option<Note>,
    pub active: ActivePvState,
}

impl Card {
    pub fn new(id: CardId, position: Point) -> Self {
        Self {
            id,
            position,
            width: CARD_WIDTH,
            height: CARD_HEIGHT,
            explicit_width: false,
            locked: false,
            title: "RUY1234567890".to_string(),
            body: default_body("330/330pv"),
            dark_mode: false,
            body_class: String::new(),
            header_bg: HEADER_PALETTE[0].to_string(),
            color_index: 0,
            coin_full: true,
            note: None,
            active: ActivePvState::default(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.position.x, self.position.y, self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.position.x + self.width / 2.0,
            self.position.y + self.height / 2.0,
        )
    }

    pub fn row(&self, kind: RowKind) -> Option<&BodyRow> {
        self.body.iter().find(|r| r.kind == kind)
    }

    pub fn row_mut(&mut self, kind: RowKind) -> Option<&mut BodyRow> {
        self.body.iter_mut().find(|r| r.kind == kind)
    }

    /// Current active-orders counters; `0 / 0` when the row is missing or
    /// unparsable.
    pub fn active_orders(&self) -> Pair {
        self.row(RowKind::ActiveOrders)
            .and_then(|r| body::parse_pair(&r.value))
            .unwrap_or_default()
    }

    /// Write the active-orders counters. Returns `false` if the card has no
    /// active-orders row.
    pub fn set_active_orders(&mut self, pair: Pair) -> bool {
        match self.row_mut(RowKind::ActiveOrders) {
            Some(row) => {
                row.value = body::format_pair(pair);
                true
            }
            None => false,
        }
    }

    /// `current/target` from the PV row.
    pub fn pv_progress(&self) -> Option<body::PvProgress> {
        self.row(RowKind::Pv)
            .and_then(|r| body::parse_pv_progress(&r.value))
    }

    /// Cycle the header color through [`HEADER_PALETTE`].
    pub fn cycle_header_color(&mut self) {
        self.color_index = (self.color_index + 1) % HEADER_PALETTE.len();
        self.header_bg = HEADER_PALETTE[self.color_index].to_string();
    }

    pub fn has_note_entries(&self) -> bool {
        self.note.as_ref().is_some_and(Note::has_any_entry)
    }
}

/// An orthogonal connector between two card anchors.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: LineId,
    pub start: CardId,
    pub start_side: Side,
    pub end: CardId,
    pub end_side: Side,
    pub color: String,
    pub thickness: f32,
}

impl Line {
    pub fn touches(&self, card: CardId) -> bool {
        self.start == card || self.end == card
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_entries_do_not_count() {
        let mut note = Note::new(0.0, 0.0, "2024-05-01");
        assert!(!note.has_any_entry());
        note.set_entry("2024-05-01", "   \n ");
        assert!(!note.has_any_entry());
        assert!(note.entries.is_empty());
        note.set_entry("2024-05-02", "call back");
        assert!(note.has_any_entry());
        note.set_entry("2024-05-02", "");
        assert!(!note.has_any_entry());
    }

    #[test]
    fn indicator_follows_selected_date_color() {
        let mut note = Note::new(0.0, 0.0, "2024-05-01");
        note.colors.insert("2024-05-01".into(), "#4caf50".into());
        assert_eq!(note.indicator_color(), None);
        note.set_entry("2024-05-01", "daily activity");
        assert_eq!(note.indicator_color(), Some("#4caf50"));
        note.set_entry("2024-05-01", "");
        assert_eq!(note.indicator_color(), None);
    }

    #[test]
    fn legacy_text_migrates_into_entries() {
        let mut note = Note::new(0.0, 0.0, "");
        note.text = Some("old note".into());
        note.ensure_structure("2024-01-10");
        assert_eq!(note.selected_date, "2024-01-10");
        assert_eq!(note.entry("2024-01-10"), Some("old note"));
        assert!(note.text.is_none());
    }

    #[test]
    fn note_resize_ignores_small_sizes() {
        let mut note = Note::new(0.0, 0.0, "2024-01-10");
        note.resize(150.0, 420.0);
        assert_eq!(note.width, NOTE_DEFAULT_WIDTH);
        assert_eq!(note.height, 420.0);
    }

    #[test]
    fn note_color_falls_back_to_highlight() {
        let mut note = Note::new(0.0, 0.0, "2024-01-10");
        assert_eq!(note.color_for("2024-01-10"), NOTE_DEFAULT_HIGHLIGHT);
        note.colors.insert("2024-01-10".into(), "#42a5f5".into());
        assert_eq!(note.color_for("2024-01-10"), "#42a5f5");
    }

    #[test]
    fn row_kind_from_label() {
        assert_eq!(RowKind::from_label("Баланс:"), RowKind::Balance);
        assert_eq!(RowKind::from_label(" Актив-заказы PV:"), RowKind::ActiveOrders);
        assert_eq!(RowKind::from_label("Cycle"), RowKind::Cycle);
        assert_eq!(RowKind::from_label("Phone"), RowKind::Custom);
    }

    #[test]
    fn active_orders_read_and_write() {
        let mut card = Card::new(CardId::intern("model_card"), Point::default());
        assert_eq!(card.active_orders(), Pair::new(0, 0));
        assert!(card.set_active_orders(Pair::new(12, 300)));
        assert_eq!(card.row(RowKind::ActiveOrders).map(|r| r.value.as_str()), Some("12 / 300"));
        assert_eq!(card.active_orders(), Pair::new(12, 300));
    }

    #[test]
    fn header_palette_cycles() {
        let mut card = Card::new(CardId::intern("palette_card"), Point::default());
        for _ in 0..HEADER_PALETTE.len() {
            card.cycle_header_color();
        }
        assert_eq!(card.color_index, 0);
        assert_eq!(card.header_bg, HEADER_PALETTE[0]);
    }

    #[test]
    fn color_hex_is_lowercase() {
        let c = Color::rgb(0x11, 0x22, 0x33);
        assert_eq!(c.to_hex(), "#112233");
    }
}
