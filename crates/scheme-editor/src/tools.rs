//! Pointer gestures on the board.
//!
//! Translates [`InputEvent`]s into engine calls. A pointer-down decides the
//! gesture by what lies under it, in this order:
//!
//! | Target | Gesture |
//! |--------|---------|
//! | middle button anywhere | pan |
//! | connection point of an unlocked card | start or finish a line |
//! | card, with Ctrl/⌘ | toggle it in the selection |
//! | card header | drag the selection (snapped to the grid) |
//! | card body | nothing beyond dropping the selected line |
//! | line | select it |
//! | empty canvas | marquee (when the gate allows) |
//!
//! Line drawing is click-to-click: the first connection point starts a
//! dashed preview that follows the pointer, the second one commits.

use crate::board::{BoardEngine, BoardEvent, LineDraft};
use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::selection::{CardSet, MarqueeGate};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use scheme_core::geometry::{Bounds, Point, snap_to_grid};
use scheme_core::id::CardId;
use scheme_core::model::Side;
use scheme_core::route::{LinePath, anchor_point, route_line};
use scheme_render::hit::{
    CONNECTION_POINT_RADIUS, hit_card, hit_connection_point, hit_header, hit_line, marquee_hits,
};
use smallvec::SmallVec;

/// Start positions of one dragged card and its open note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DragOrigin {
    card: CardId,
    position: Point,
    note: Option<Point>,
}

/// The gesture in progress between pointer-down and pointer-up.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) enum Gesture {
    #[default]
    Idle,
    Panning {
        last: Point,
    },
    Dragging {
        /// Pointer at drag start (screen).
        start: Point,
        origins: SmallVec<[DragOrigin; 8]>,
        moved: bool,
    },
    Marquee {
        /// Anchor corner (screen).
        start: Point,
        base: CardSet,
        rect: Bounds,
    },
}

impl BoardEngine {
    /// Feed one input event. Returns `true` when the board needs a repaint.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(Point::new(*x, *y), *button, *modifiers),
            InputEvent::PointerMove { x, y } => self.pointer_move(Point::new(*x, *y)),
            InputEvent::PointerUp { button, .. } => self.pointer_up(*button),
            InputEvent::Wheel { x, y, delta_y } => {
                self.zoom_wheel(Point::new(*x, *y), *delta_y);
                true
            }
            InputEvent::Key { key, modifiers } => match ShortcutMap::resolve(key, *modifiers) {
                Some(action) => self.run_shortcut(action),
                None => false,
            },
        }
    }

    pub fn run_shortcut(&mut self, action: ShortcutAction) -> bool {
        log::trace!("shortcut: {action:?}");
        match action {
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Redo => self.redo(),
            ShortcutAction::Copy => {
                self.copy();
                false
            }
            ShortcutAction::Paste => !self.paste().is_empty(),
            ShortcutAction::Delete => self.delete_selection(),
            ShortcutAction::Escape => {
                self.escape();
                true
            }
        }
    }

    /// Preview path of the line being drawn.
    pub fn draft_path(&self) -> Option<LinePath> {
        let draft = self.draft.as_ref()?;
        let start = self.graph.card(draft.start)?.bounds();
        let p1 = anchor_point(&start, draft.side);
        Some(route_line(
            p1,
            draft.side,
            draft.pointer,
            None,
            self.config.marker_offset,
        ))
    }

    /// Marquee rectangle in screen space while one is being dragged.
    pub fn marquee_rect(&self) -> Option<Bounds> {
        match &self.gesture {
            Gesture::Marquee { rect, .. } => Some(*rect),
            _ => None,
        }
    }

    pub fn is_panning(&self) -> bool {
        self.view.is_panning
    }

    // ─── Pointer down ────────────────────────────────────────────────────

    fn pointer_down(&mut self, screen: Point, button: PointerButton, modifiers: Modifiers) -> bool {
        match button {
            PointerButton::Middle => {
                self.view.is_panning = true;
                self.gesture = Gesture::Panning { last: screen };
                return false;
            }
            PointerButton::Secondary => return false,
            PointerButton::Primary => {}
        }

        let canvas = self.view.screen_to_canvas(screen);
        let radius = CONNECTION_POINT_RADIUS / self.view.scale;

        if let Some((card, side)) = hit_connection_point(&self.graph, canvas, radius)
            && self.graph.card(card).is_some_and(|c| !c.locked)
        {
            self.selection.clear_line();
            return self.connection_point_pressed(card, side, canvas);
        }

        if let Some(card) = hit_card(&self.graph, canvas) {
            self.selection.clear_line();
            if modifiers.command() {
                self.selection.toggle_card(card);
                return true;
            }
            if !self.selection.mode && hit_header(&self.graph, canvas) == Some(card) {
                self.start_drag(card, screen);
            }
            return true;
        }

        if let Some(line) = hit_line(&self.graph, canvas, self.config.marker_offset) {
            return self.select_line(line);
        }

        let had_line = self.selection.line().is_some();
        self.selection.clear_line();
        let gate_open = match self.config.marquee_gate {
            MarqueeGate::SelectionMode => self.selection.mode,
            MarqueeGate::EmptyCanvas => true,
        };
        if gate_open {
            let base: CardSet = if modifiers.command() {
                self.selection.cards().iter().copied().collect()
            } else {
                CardSet::new()
            };
            self.selection.set_cards(base.iter().copied());
            self.gesture = Gesture::Marquee {
                start: screen,
                base,
                rect: Bounds::new(screen.x, screen.y, 0.0, 0.0),
            };
            return true;
        }
        had_line
    }

    fn connection_point_pressed(&mut self, card: CardId, side: Side, canvas: Point) -> bool {
        let Some(draft) = self.draft.take() else {
            log::trace!("drawing from {card}.{}", side.as_str());
            self.draft = Some(LineDraft {
                start: card,
                side,
                pointer: canvas,
            });
            return true;
        };
        if draft.start == card {
            log::trace!("drawing cancelled on its own card");
            return true;
        }
        let (color, thickness) = {
            let (c, t) = self.line_style();
            (c.to_string(), t)
        };
        if self
            .create_line(draft.start, draft.side, card, side, &color, thickness)
            .is_some()
        {
            self.commit();
        }
        true
    }

    fn start_drag(&mut self, card: CardId, screen: Point) {
        if self.graph.card(card).is_some_and(|c| c.locked) {
            return;
        }
        if !self.selection.contains(card) {
            self.selection.set_cards([card]);
        }
        let origins: SmallVec<[DragOrigin; 8]> = self
            .selection
            .cards()
            .iter()
            .filter_map(|id| self.graph.card(*id))
            .filter(|c| !c.locked)
            .map(|c| DragOrigin {
                card: c.id,
                position: c.position,
                note: c
                    .note
                    .as_ref()
                    .filter(|n| n.visible)
                    .map(|n| Point::new(n.x, n.y)),
            })
            .collect();
        self.gesture = Gesture::Dragging {
            start: screen,
            origins,
            moved: false,
        };
    }

    // ─── Pointer move ────────────────────────────────────────────────────

    fn pointer_move(&mut self, screen: Point) -> bool {
        match &mut self.gesture {
            Gesture::Panning { last } => {
                let (dx, dy) = (screen.x - last.x, screen.y - last.y);
                *last = screen;
                self.view.pan_by(dx, dy);
                true
            }
            Gesture::Dragging {
                start,
                origins,
                moved,
            } => {
                let (sdx, sdy) = (screen.x - start.x, screen.y - start.y);
                let (cdx, cdy) = (sdx / self.view.scale, sdy / self.view.scale);
                let grid = self.config.grid_size;
                for origin in origins.iter() {
                    let Some(card) = self.graph.card_mut(origin.card) else {
                        continue;
                    };
                    let target = Point::new(
                        snap_to_grid(origin.position.x + cdx, grid),
                        snap_to_grid(origin.position.y + cdy, grid),
                    );
                    if target != card.position {
                        card.position = target;
                    }
                    if target != origin.position {
                        *moved = true;
                    }
                    if let (Some(start), Some(note)) = (origin.note, card.note.as_mut()) {
                        note.x = start.x + sdx;
                        note.y = start.y + sdy;
                    }
                }
                log::trace!("drag: {} cards by ({cdx}, {cdy})", origins.len());
                true
            }
            Gesture::Marquee { start, base, rect } => {
                *rect = Bounds::from_corners(*start, screen);
                let mut cards = base.clone();
                for id in marquee_hits(&self.graph, &self.view, rect) {
                    if !cards.contains(&id) {
                        cards.push(id);
                    }
                }
                self.selection.set_cards(cards);
                true
            }
            Gesture::Idle => match self.draft.as_mut() {
                Some(draft) => {
                    draft.pointer = self.view.screen_to_canvas(screen);
                    true
                }
                None => false,
            },
        }
    }

    // ─── Pointer up ──────────────────────────────────────────────────────

    fn pointer_up(&mut self, button: PointerButton) -> bool {
        let gesture = std::mem::take(&mut self.gesture);
        match (gesture, button) {
            (Gesture::Panning { .. }, PointerButton::Middle) => {
                self.view.is_panning = false;
                false
            }
            (Gesture::Dragging { moved, origins, .. }, PointerButton::Primary) => {
                if moved {
                    log::debug!("drag committed ({} cards)", origins.len());
                    self.commit();
                }
                moved
            }
            (Gesture::Marquee { .. }, PointerButton::Primary) => {
                if self.config.marquee_gate == MarqueeGate::SelectionMode
                    && !self.selection.cards().is_empty()
                {
                    self.selection.mode = false;
                    self.emit(BoardEvent::Changed);
                }
                true
            }
            (other, _) => {
                self.gesture = other;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::board::{BoardConfig, CardOptions};
    use crate::input::InputEvent;
    use super::*;
    use scheme_core::geometry::Viewport;

    fn engine() -> BoardEngine {
        BoardEngine::new(BoardConfig::default(), Viewport::default())
    }

    fn card_at(e: &mut BoardEngine, x: f32, y: f32) -> CardId {
        e.create_card(CardOptions {
            position: Some(Point::new(x, y)),
            ..CardOptions::default()
        })
    }

    fn middle(x: f32, y: f32, down: bool) -> InputEvent {
        if down {
            InputEvent::PointerDown {
                x,
                y,
                button: PointerButton::Middle,
                modifiers: Modifiers::NONE,
            }
        } else {
            InputEvent::PointerUp {
                x,
                y,
                button: PointerButton::Middle,
            }
        }
    }

    #[test]
    fn middle_button_pans() {
        let mut e = engine();
        e.handle_input(&middle(10.0, 10.0, true));
        assert!(e.is_panning());
        e.handle_input(&InputEvent::pointer_move(40.0, 30.0));
        e.handle_input(&InputEvent::pointer_move(50.0, 50.0));
        e.handle_input(&middle(50.0, 50.0, false));
        assert!(!e.is_panning());
        assert_eq!((e.view().x, e.view().y), (40.0, 40.0));
    }

    #[test]
    fn drag_snaps_and_commits_once() {
        let mut e = engine();
        let a = card_at(&mut e, 0.0, 0.0);
        e.commit();
        let depth = e.history.undo_depth();

        e.handle_input(&InputEvent::pointer_down(100.0, 20.0, Modifiers::NONE));
        e.handle_input(&InputEvent::pointer_move(150.0, 50.0));
        assert_eq!(e.graph().card(a).unwrap().position, Point::new(70.0, 0.0));
        e.handle_input(&InputEvent::pointer_move(200.0, 100.0));
        e.handle_input(&InputEvent::pointer_up(200.0, 100.0));

        assert_eq!(e.graph().card(a).unwrap().position, Point::new(70.0, 70.0));
        assert_eq!(e.history.undo_depth(), depth + 1);
        assert_eq!(e.selection().cards(), &[a]);
    }

    #[test]
    fn click_without_motion_does_not_commit() {
        let mut e = engine();
        card_at(&mut e, 0.0, 0.0);
        e.commit();
        let depth = e.history.undo_depth();
        e.handle_input(&InputEvent::pointer_down(100.0, 20.0, Modifiers::NONE));
        e.handle_input(&InputEvent::pointer_move(110.0, 25.0));
        e.handle_input(&InputEvent::pointer_up(110.0, 25.0));
        assert_eq!(e.history.undo_depth(), depth);
    }

    #[test]
    fn body_press_does_not_drag() {
        let mut e = engine();
        let a = card_at(&mut e, 0.0, 0.0);
        e.commit();
        let depth = e.history.undo_depth();
        // Below the 44-unit header, on the body rows.
        e.handle_input(&InputEvent::pointer_down(100.0, 120.0, Modifiers::NONE));
        e.handle_input(&InputEvent::pointer_move(400.0, 400.0));
        e.handle_input(&InputEvent::pointer_up(400.0, 400.0));
        assert_eq!(e.graph().card(a).unwrap().position, Point::new(0.0, 0.0));
        assert_eq!(e.history.undo_depth(), depth);
        assert!(e.selection().cards().is_empty());
    }

    #[test]
    fn locked_card_does_not_drag() {
        let mut e = engine();
        let a = card_at(&mut e, 0.0, 0.0);
        e.toggle_lock(a);
        e.handle_input(&InputEvent::pointer_down(100.0, 20.0, Modifiers::NONE));
        e.handle_input(&InputEvent::pointer_move(400.0, 400.0));
        e.handle_input(&InputEvent::pointer_up(400.0, 400.0));
        assert_eq!(e.graph().card(a).unwrap().position, Point::new(0.0, 0.0));
    }

    #[test]
    fn click_to_click_line_drawing() {
        let mut e = engine();
        let a = card_at(&mut e, 0.0, 0.0);
        let b = card_at(&mut e, 0.0, 420.0);
        // a.bottom anchor is (190, 280); b.top anchor is (190, 420).
        e.handle_input(&InputEvent::pointer_down(190.0, 280.0, Modifiers::NONE));
        e.handle_input(&InputEvent::pointer_up(190.0, 280.0));
        assert!(e.draft().is_some());
        e.handle_input(&InputEvent::pointer_move(300.0, 350.0));
        let preview = e.draft_path().unwrap();
        assert_eq!(preview.end(), Point::new(300.0, 350.0));

        e.handle_input(&InputEvent::pointer_down(190.0, 420.0, Modifiers::NONE));
        assert!(e.draft().is_none());
        let line = &e.graph().lines()[0];
        assert_eq!((line.start, line.start_side), (a, Side::Bottom));
        assert_eq!((line.end, line.end_side), (b, Side::Top));
        assert_eq!(line.color, "#0f62fe");
        assert_eq!(line.thickness, 5.0);
    }

    #[test]
    fn finishing_on_same_card_cancels() {
        let mut e = engine();
        card_at(&mut e, 0.0, 0.0);
        e.handle_input(&InputEvent::pointer_down(190.0, 280.0, Modifiers::NONE));
        e.handle_input(&InputEvent::pointer_down(380.0, 140.0, Modifiers::NONE));
        assert!(e.draft().is_none());
        assert!(e.graph().lines().is_empty());
    }

    #[test]
    fn escape_discards_draft() {
        let mut e = engine();
        card_at(&mut e, 0.0, 0.0);
        e.handle_input(&InputEvent::pointer_down(190.0, 280.0, Modifiers::NONE));
        e.handle_input(&InputEvent::key("Escape", Modifiers::NONE));
        assert!(e.draft().is_none());
        assert!(e.draft_path().is_none());
    }

    #[test]
    fn ctrl_click_toggles_selection() {
        let mut e = engine();
        let a = card_at(&mut e, 0.0, 0.0);
        let b = card_at(&mut e, 700.0, 0.0);
        e.handle_input(&InputEvent::pointer_down(100.0, 100.0, Modifiers::CTRL));
        e.handle_input(&InputEvent::pointer_down(800.0, 100.0, Modifiers::CTRL));
        assert_eq!(e.selection().cards(), &[a, b]);
        e.handle_input(&InputEvent::pointer_down(100.0, 100.0, Modifiers::CTRL));
        assert_eq!(e.selection().cards(), &[b]);
    }

    #[test]
    fn marquee_needs_selection_mode() {
        let mut e = engine();
        card_at(&mut e, 0.0, 0.0);
        e.handle_input(&InputEvent::pointer_down(600.0, 600.0, Modifiers::NONE));
        e.handle_input(&InputEvent::pointer_move(50.0, 50.0));
        assert!(e.marquee_rect().is_none());
        assert!(e.selection().cards().is_empty());
    }

    #[test]
    fn legacy_gate_allows_marquee_anywhere() {
        let config = BoardConfig {
            marquee_gate: MarqueeGate::EmptyCanvas,
            ..BoardConfig::default()
        };
        let mut e = BoardEngine::new(config, Viewport::default());
        let a = card_at(&mut e, 0.0, 0.0);
        e.handle_input(&InputEvent::pointer_down(600.0, 600.0, Modifiers::NONE));
        e.handle_input(&InputEvent::pointer_move(50.0, 50.0));
        e.handle_input(&InputEvent::pointer_up(50.0, 50.0));
        assert_eq!(e.selection().cards(), &[a]);
    }

    #[test]
    fn clicking_a_line_selects_it() {
        let mut e = engine();
        let a = card_at(&mut e, 0.0, 0.0);
        let b = card_at(&mut e, 0.0, 700.0);
        let l = e.create_line(a, Side::Bottom, b, Side::Top, "#0f62fe", 5.0).unwrap();
        e.selection.set_cards([a]);
        // Vertical run of the path at x = 190, between the cards.
        e.handle_input(&InputEvent::pointer_down(190.0, 500.0, Modifiers::NONE));
        assert_eq!(e.selection().line(), Some(l));
        assert!(e.selection().cards().is_empty());

        e.handle_input(&InputEvent::pointer_down(900.0, 900.0, Modifiers::NONE));
        assert_eq!(e.selection().line(), None);
    }
}
