//! Snapshot undo/redo stack.
//!
//! Every undoable action ends with one `commit`, which pushes a full
//! snapshot of the board. The top of the undo stack is always the current
//! state, so undo needs at least two entries: it moves the top onto the
//! redo stack and hands back the new top for restoration.
//!
//! Entries are stored as MessagePack bytes, which keeps fifty full-board
//! snapshots small.

use scheme_core::error::SnapshotCodecError;
use scheme_core::snapshot::Snapshot;
use std::collections::VecDeque;

/// Default number of snapshots kept.
pub const HISTORY_LIMIT: usize = 50;

pub struct History {
    /// Oldest entry at the front, current state at the back.
    undo_stack: VecDeque<Vec<u8>>,
    redo_stack: Vec<Vec<u8>>,
    /// Maximum undo depth.
    max_depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_depth.max(1) + 1),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Push the current state. Drops the oldest entry past the limit and
    /// clears the redo stack.
    pub fn commit(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotCodecError> {
        let bytes = snapshot.to_msgpack()?;
        self.undo_stack.push_back(bytes);
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
        log::debug!(
            "history commit ({} cards, {} lines), depth {}",
            snapshot.cards.len(),
            snapshot.lines.len(),
            self.undo_stack.len()
        );
        Ok(())
    }

    /// Step back. Returns the snapshot to restore, or `None` when there is
    /// no earlier state.
    pub fn undo(&mut self) -> Option<Snapshot> {
        if self.undo_stack.len() < 2 {
            return None;
        }
        let current = self.undo_stack.pop_back()?;
        let previous = self.undo_stack.back()?;
        match Snapshot::from_msgpack(previous) {
            Ok(snap) => {
                self.redo_stack.push(current);
                Some(snap)
            }
            Err(e) => {
                log::warn!("undo: {e}");
                self.undo_stack.push_back(current);
                None
            }
        }
    }

    /// Step forward. Returns the snapshot to restore.
    pub fn redo(&mut self) -> Option<Snapshot> {
        let bytes = self.redo_stack.pop()?;
        match Snapshot::from_msgpack(&bytes) {
            Ok(snap) => {
                self.undo_stack.push_back(bytes);
                Some(snap)
            }
            Err(e) => {
                log::warn!("redo: {e}");
                self.redo_stack.push(bytes);
                None
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Snapshot on top of the undo stack (the current state).
    pub fn current(&self) -> Option<Snapshot> {
        self.undo_stack
            .back()
            .and_then(|b| Snapshot::from_msgpack(b).ok())
    }
}
