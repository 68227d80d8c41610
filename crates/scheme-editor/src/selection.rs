//! Selection state: a set of cards or a single line, never both.

use scheme_core::id::{CardId, LineId};
use smallvec::SmallVec;

pub type CardSet = SmallVec<[CardId; 8]>;

/// Who may start a marquee on empty canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarqueeGate {
    /// Only while selection mode is toggled on; release turns it off once
    /// something is selected.
    #[default]
    SelectionMode,
    /// Any primary-button drag on empty canvas.
    EmptyCanvas,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Selected cards in selection order.
    cards: CardSet,
    line: Option<LineId>,
    /// Selection mode toggle (crosshair cursor).
    pub mode: bool,
}

impl Selection {
    pub fn cards(&self) -> &[CardId] {
        &self.cards
    }

    pub fn line(&self) -> Option<LineId> {
        self.line
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.cards.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty() && self.line.is_none()
    }

    /// Select a line; clears cards and replaces any previous line.
    pub fn select_line(&mut self, id: LineId) {
        self.cards.clear();
        self.line = Some(id);
    }

    pub fn clear_line(&mut self) {
        self.line = None;
    }

    /// Toggle a card in or out. Adding a card clears the line selection.
    pub fn toggle_card(&mut self, id: CardId) {
        if let Some(pos) = self.cards.iter().position(|c| *c == id) {
            self.cards.remove(pos);
        } else {
            self.line = None;
            self.cards.push(id);
        }
    }

    /// Replace the card selection. The line selection is left alone.
    pub fn set_cards(&mut self, ids: impl IntoIterator<Item = CardId>) {
        self.cards.clear();
        for id in ids {
            if !self.cards.contains(&id) {
                self.cards.push(id);
            }
        }
    }

    pub fn clear_cards(&mut self) {
        self.cards.clear();
    }

    /// Drop everything, selection mode included.
    pub fn clear_all(&mut self) {
        self.cards.clear();
        self.line = None;
        self.mode = false;
    }

    /// Forget a deleted card.
    pub fn forget_card(&mut self, id: CardId) {
        self.cards.retain(|c| *c != id);
    }

    pub fn forget_line(&mut self, id: LineId) {
        if self.line == Some(id) {
            self.line = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_and_cards_are_exclusive() {
        let mut s = Selection::default();
        let a = CardId::intern("sel_a");
        s.toggle_card(a);
        s.select_line(LineId::intern("sel_l"));
        assert!(s.cards().is_empty());
        s.toggle_card(a);
        assert_eq!(s.line(), None);
        assert_eq!(s.cards(), &[a]);
        s.toggle_card(a);
        assert!(s.is_empty());
    }

    #[test]
    fn set_cards_dedups() {
        let mut s = Selection::default();
        let a = CardId::intern("sel_d1");
        let b = CardId::intern("sel_d2");
        s.set_cards([a, b, a]);
        assert_eq!(s.cards(), &[a, b]);
    }
}
