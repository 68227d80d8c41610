//! The graph store: cards and the lines between them.
//!
//! Cards and lines are kept in insertion order (the order they serialize
//! and paint in) with an id index for O(1) lookup. The store enforces the
//! structural invariants: ids are unique, lines never loop onto one card,
//! and every line endpoint resolves to a live card.

use crate::geometry::Bounds;
use crate::id::{CardId, LineId};
use crate::model::{Card, Line};
use crate::route::{LinePath, route_between};
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct BoardGraph {
    cards: Vec<Card>,
    lines: Vec<Line>,
    /// Index from CardId → position in `cards`.
    card_index: HashMap<CardId, usize>,
}

impl BoardGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty() && self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
        self.lines.clear();
        self.card_index.clear();
    }

    // ─── Cards ───────────────────────────────────────────────────────────

    /// Append a card. Returns `false` if its id is already taken.
    pub fn insert_card(&mut self, card: Card) -> bool {
        if self.card_index.contains_key(&card.id) {
            return false;
        }
        self.card_index.insert(card.id, self.cards.len());
        self.cards.push(card);
        true
    }

    /// Remove a card and every line touching it. Returns the card and the
    /// ids of the cascaded lines.
    pub fn remove_card(&mut self, id: CardId) -> Option<(Card, SmallVec<[LineId; 4]>)> {
        let idx = *self.card_index.get(&id)?;
        let mut removed_lines = SmallVec::new();
        self.lines.retain(|l| {
            if l.touches(id) {
                removed_lines.push(l.id);
                false
            } else {
                true
            }
        });
        let card = self.cards.remove(idx);
        self.rebuild_index();
        Some((card, removed_lines))
    }

    pub fn contains_card(&self, id: CardId) -> bool {
        self.card_index.contains_key(&id)
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.card_index.get(&id).map(|&i| &self.cards[i])
    }

    pub fn card_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.card_index
            .get(&id)
            .copied()
            .map(move |i| &mut self.cards[i])
    }

    pub fn cards_mut(&mut self) -> impl Iterator<Item = &mut Card> {
        self.cards.iter_mut()
    }

    /// Bounds covering every card, if any.
    pub fn content_bounds(&self) -> Option<Bounds> {
        self.cards
            .iter()
            .map(Card::bounds)
            .reduce(|acc, b| acc.union(&b))
    }

    fn rebuild_index(&mut self) {
        self.card_index = self
            .cards
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
    }

    // ─── Lines ───────────────────────────────────────────────────────────

    /// Append a line. Self-loops, missing endpoints and duplicate ids are
    /// rejected with `false`. Parallel lines between the same anchors are
    /// allowed.
    pub fn insert_line(&mut self, line: Line) -> bool {
        if line.start == line.end
            || !self.contains_card(line.start)
            || !self.contains_card(line.end)
            || self.line(line.id).is_some()
        {
            return false;
        }
        self.lines.push(line);
        true
    }

    pub fn remove_line(&mut self, id: LineId) -> Option<Line> {
        let idx = self.lines.iter().position(|l| l.id == id)?;
        Some(self.lines.remove(idx))
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.iter().find(|l| l.id == id)
    }

    pub fn line_mut(&mut self, id: LineId) -> Option<&mut Line> {
        self.lines.iter_mut().find(|l| l.id == id)
    }

    pub fn lines_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.lines.iter_mut()
    }

    /// Lines with either endpoint on `card`.
    pub fn incident_lines(&self, card: CardId) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(move |l| l.touches(card))
    }

    /// Route a line from the live bounds of its two cards.
    pub fn line_path(&self, line: &Line, marker_offset: f32) -> Option<LinePath> {
        let start = self.card(line.start)?.bounds();
        let end = self.card(line.end)?.bounds();
        Some(route_between(
            &start,
            line.start_side,
            &end,
            line.end_side,
            marker_offset,
        ))
    }
}
