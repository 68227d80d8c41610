//! Snapshots: the undo unit and the project file format.
//!
//! A [`Snapshot`] is a plain DTO copy of every card and line. It serializes
//! as the browser board's project JSON (`serde_json`) and, for the history
//! stack, as compact MessagePack (`rmp-serde`).

use crate::body::{emit_body_html, parse_css_px, scan_body_html};
use crate::error::{LoadError, SnapshotCodecError};
use crate::graph::BoardGraph;
use crate::id::{CardId, LineId};
use crate::model::{
    ActivePvState, CARD_HEIGHT, CARD_WIDTH, Card, HEADER_PALETTE, Line, Note, Side,
};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    /// CSS width (`"494px"`), `null` for the default width.
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "bodyHTML", default)]
    pub body_html: String,
    #[serde(default)]
    pub is_dark_mode: bool,
    #[serde(default)]
    pub body_class: String,
    #[serde(default)]
    pub header_bg: String,
    #[serde(default)]
    pub color_index: usize,
    #[serde(default)]
    pub note: Option<Note>,
    /// Absent in older files; the hidden counters are then read from
    /// `bodyHTML`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_pv: Option<ActivePvState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDto {
    pub start_id: String,
    pub start_side: Side,
    pub end_id: String,
    pub end_side: Side,
    pub color: String,
    pub thickness: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub cards: Vec<CardDto>,
    pub lines: Vec<LineDto>,
}

impl CardDto {
    pub fn from_card(card: &Card) -> Self {
        Self {
            id: card.id.as_str().to_string(),
            x: card.position.x,
            y: card.position.y,
            width: card
                .explicit_width
                .then(|| format!("{}px", card.width)),
            locked: card.locked,
            title: card.title.clone(),
            body_html: emit_body_html(&card.body, card.coin_full, &card.active),
            is_dark_mode: card.dark_mode,
            body_class: card.body_class.clone(),
            header_bg: card.header_bg.clone(),
            color_index: card.color_index,
            note: card.note.clone(),
            active_pv: Some(card.active),
        }
    }

    /// Build a card with the given id. `today` fills in missing note dates.
    pub fn to_card(&self, id: CardId, today: &str) -> Card {
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        let mut card = Card::new(id, Point::new(finite(self.x), finite(self.y)));

        if let Some(w) = self.width.as_deref().and_then(parse_css_px) {
            card.width = w;
            card.explicit_width = true;
        } else {
            card.width = CARD_WIDTH;
        }
        card.height = CARD_HEIGHT;
        card.locked = self.locked;
        card.title = self.title.clone();

        let scanned = scan_body_html(&self.body_html);
        card.body = scanned.rows;
        if let Some(full) = scanned.coin_full {
            card.coin_full = full;
        }
        card.active = self.active_pv.or(scanned.active).unwrap_or_default();

        card.dark_mode = self.is_dark_mode;
        card.body_class = self.body_class.clone();
        card.color_index = self.color_index % HEADER_PALETTE.len();
        card.header_bg = if self.header_bg.is_empty() {
            HEADER_PALETTE[card.color_index].to_string()
        } else {
            self.header_bg.clone()
        };
        card.note = self.note.clone().map(|mut n| {
            n.ensure_structure(today);
            n
        });
        card
    }
}

impl LineDto {
    pub fn from_line(line: &Line) -> Self {
        Self {
            start_id: line.start.as_str().to_string(),
            start_side: line.start_side,
            end_id: line.end.as_str().to_string(),
            end_side: line.end_side,
            color: line.color.clone(),
            thickness: line.thickness,
        }
    }
}

impl Snapshot {
    /// Copy the current graph into DTOs, in insertion order.
    pub fn capture(graph: &BoardGraph) -> Self {
        Self {
            cards: graph.cards().iter().map(CardDto::from_card).collect(),
            lines: graph.lines().iter().map(LineDto::from_line).collect(),
        }
    }

    /// Rebuild a graph from this snapshot.
    ///
    /// Card ids are reused when they are non-empty and unique within the
    /// snapshot; duplicates get fresh ids, and line endpoints referring to a
    /// duplicated id resolve to its last occurrence. Lines always get fresh
    /// ids. Lines whose endpoints do not resolve are skipped.
    pub fn restore(&self, today: &str) -> BoardGraph {
        let mut graph = BoardGraph::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut by_dto_id: HashMap<&str, CardId> = HashMap::new();

        for dto in &self.cards {
            let id = if !dto.id.is_empty() && seen.insert(dto.id.as_str()) {
                CardId::intern(&dto.id)
            } else {
                CardId::generate()
            };
            if graph.insert_card(dto.to_card(id, today)) {
                by_dto_id.insert(dto.id.as_str(), id);
            }
        }

        for dto in &self.lines {
            let (Some(&start), Some(&end)) = (
                by_dto_id.get(dto.start_id.as_str()),
                by_dto_id.get(dto.end_id.as_str()),
            ) else {
                log::warn!(
                    "skipping line {} -> {}: endpoint not in snapshot",
                    dto.start_id,
                    dto.end_id
                );
                continue;
            };
            let line = Line {
                id: LineId::generate(),
                start,
                start_side: dto.start_side,
                end,
                end_side: dto.end_side,
                color: dto.color.clone(),
                thickness: dto.thickness,
            };
            if !graph.insert_line(line) {
                log::warn!("skipping self-loop line on {}", dto.start_id);
            }
        }

        log::debug!(
            "restored snapshot: {} cards, {} lines",
            graph.cards().len(),
            graph.lines().len()
        );
        graph
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty() && self.lines.is_empty()
    }

    // ─── Project file ────────────────────────────────────────────────────

    /// Serialize as the indented project JSON written by "save project".
    pub fn to_json_pretty(&self) -> String {
        // Every field is a string, number, bool, map or seq: this cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Parse a project file. HTML exports, JSON without `cards`/`lines`
    /// arrays, and malformed JSON are distinct errors.
    pub fn from_project_file(text: &str) -> Result<Self, LoadError> {
        if looks_like_html(text) {
            return Err(LoadError::HtmlExport);
        }
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| LoadError::Malformed(e.to_string()))?;
        let well_formed = value.get("cards").is_some_and(serde_json::Value::is_array)
            && value.get("lines").is_some_and(serde_json::Value::is_array);
        if !well_formed {
            return Err(LoadError::BadStructure);
        }
        serde_json::from_value(value).map_err(|e| LoadError::Malformed(e.to_string()))
    }

    // ─── History encoding ────────────────────────────────────────────────

    pub fn to_msgpack(&self) -> Result<Vec<u8>, SnapshotCodecError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, SnapshotCodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// `<!doctype html` at the start, or an `<html` tag anywhere.
fn looks_like_html(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    if lower.trim_start().starts_with("<!doctype html") {
        return true;
    }
    lower.match_indices("<html").any(|(i, m)| {
        lower[i + m.len()..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c.is_whitespace())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RowKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn html_exports_are_rejected() {
        assert_eq!(
            Snapshot::from_project_file("  <!DOCTYPE html><html></html>"),
            Err(LoadError::HtmlExport)
        );
        assert_eq!(
            Snapshot::from_project_file("garbage <html lang=\"ru\">"),
            Err(LoadError::HtmlExport)
        );
    }

    #[test]
    fn missing_arrays_are_bad_structure() {
        assert_eq!(
            Snapshot::from_project_file(r#"{"cards": []}"#),
            Err(LoadError::BadStructure)
        );
        assert_eq!(
            Snapshot::from_project_file(r#"{"cards": {}, "lines": []}"#),
            Err(LoadError::BadStructure)
        );
        assert_eq!(Snapshot::from_project_file("[]"), Err(LoadError::BadStructure));
    }

    #[test]
    fn broken_json_is_malformed() {
        assert!(matches!(
            Snapshot::from_project_file("{\"cards\": ["),
            Err(LoadError::Malformed(_))
        ));
    }

    #[test]
    fn browser_file_with_legacy_body_loads() {
        let text = r##"{
          "cards": [{
            "id": "card_1700000000000_42",
            "x": 490, "y": 140, "width": "494px", "locked": true,
            "title": "RUY0001",
            "bodyHTML": "<div class=\"card-row\"><svg class=\"coin-icon\"><circle fill=\"#3d85c6\"/></svg><span class=\"value\">30/330pv</span></div><div class=\"card-row\"><span class=\"label\">Актив-заказы PV:</span><span class=\"value\">5 / 7</span></div><span class=\"active-pv-hidden\" data-btn-l=\"5\" data-btn-r=\"7\" data-locall=\"1\"></span>",
            "isDarkMode": false, "bodyClass": "", "headerBg": "rgb(93, 139, 244)",
            "colorIndex": 0,
            "note": {"text": "hello", "visible": false, "x": 1, "y": 2, "window": null}
          }],
          "lines": [{"startId": "card_1700000000000_42", "startSide": "bottom",
                     "endId": "gone", "endSide": "top", "color": "#0f62fe", "thickness": 5}]
        }"##;
        let snap = Snapshot::from_project_file(text).unwrap();
        let graph = snap.restore("2024-03-01");
        assert_eq!(graph.cards().len(), 1);
        assert!(graph.lines().is_empty());

        let card = &graph.cards()[0];
        assert_eq!(card.id.as_str(), "card_1700000000000_42");
        assert_eq!(card.width, 494.0);
        assert!(card.locked);
        assert!(!card.coin_full);
        assert_eq!(card.row(RowKind::ActiveOrders).map(|r| r.value.as_str()), Some("5 / 7"));
        assert_eq!(card.active.button_left, 5);
        assert_eq!(card.active.local_overflow_left, 1);
        let note = card.note.as_ref().unwrap();
        assert_eq!(note.entry("2024-03-01"), Some("hello"));
    }

    #[test]
    fn capture_restore_capture_is_stable() {
        let mut graph = BoardGraph::new();
        let a = CardId::intern("snap_a");
        let b = CardId::intern("snap_b");
        let mut big = Card::new(a, Point::new(0.0, 0.0));
        big.width = 494.0;
        big.explicit_width = true;
        big.active.carry_bonus_right = 3;
        graph.insert_card(big);
        graph.insert_card(Card::new(b, Point::new(70.0, 420.0)));
        graph.insert_line(Line {
            id: LineId::generate(),
            start: a,
            start_side: Side::Bottom,
            end: b,
            end_side: Side::Top,
            color: "#112233".into(),
            thickness: 4.0,
        });

        let first = Snapshot::capture(&graph);
        let second = Snapshot::capture(&first.restore("2024-01-01"));
        assert_eq!(first, second);
        assert_eq!(first.cards[0].width.as_deref(), Some("494px"));
        assert_eq!(first.cards[1].width, None);
    }

    #[test]
    fn duplicate_ids_get_fresh_identities() {
        let mut snap = Snapshot::default();
        let dto = CardDto::from_card(&Card::new(CardId::intern("snap_dup"), Point::default()));
        snap.cards.push(dto.clone());
        snap.cards.push(dto);
        let graph = snap.restore("2024-01-01");
        assert_eq!(graph.cards().len(), 2);
        assert_ne!(graph.cards()[0].id, graph.cards()[1].id);
    }

    #[test]
    fn msgpack_roundtrip() {
        let mut graph = BoardGraph::new();
        graph.insert_card(Card::new(CardId::intern("snap_mp"), Point::new(140.0, 70.0)));
        let snap = Snapshot::capture(&graph);
        let bytes = snap.to_msgpack().unwrap();
        assert_eq!(Snapshot::from_msgpack(&bytes).unwrap(), snap);
    }
}
