//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. The host
//! drops key events aimed at text inputs and editable card fields before
//! they get here.

use crate::input::Modifiers;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Undo,
    Redo,
    Copy,
    Paste,
    /// Delete selected cards and the selected line.
    Delete,
    /// Cancel line drawing, leave selection mode, clear every selection.
    Escape,
}

/// Resolves key events into shortcut actions.
///
/// Uses platform-aware modifier detection: on macOS `meta` is ⌘,
/// on other platforms `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        if modifiers.command() {
            return match key {
                "z" | "Z" if modifiers.shift => Some(ShortcutAction::Redo),
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "c" | "C" => Some(ShortcutAction::Copy),
                "v" | "V" => Some(ShortcutAction::Paste),
                _ => None,
            };
        }

        match key {
            "Escape" => Some(ShortcutAction::Escape),
            "Delete" => Some(ShortcutAction::Delete),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_redo_bindings() {
        assert_eq!(
            ShortcutMap::resolve("z", Modifiers::CTRL),
            Some(ShortcutAction::Undo)
        );
        let shift_ctrl = Modifiers {
            shift: true,
            ..Modifiers::CTRL
        };
        assert_eq!(
            ShortcutMap::resolve("Z", shift_ctrl),
            Some(ShortcutAction::Redo)
        );
        assert_eq!(
            ShortcutMap::resolve("y", Modifiers::CTRL),
            Some(ShortcutAction::Redo)
        );
        let meta = Modifiers {
            meta: true,
            ..Modifiers::NONE
        };
        assert_eq!(ShortcutMap::resolve("z", meta), Some(ShortcutAction::Undo));
    }

    #[test]
    fn copy_paste_bindings() {
        assert_eq!(
            ShortcutMap::resolve("C", Modifiers::CTRL),
            Some(ShortcutAction::Copy)
        );
        assert_eq!(
            ShortcutMap::resolve("v", Modifiers::CTRL),
            Some(ShortcutAction::Paste)
        );
    }

    #[test]
    fn bare_keys() {
        assert_eq!(
            ShortcutMap::resolve("Escape", Modifiers::NONE),
            Some(ShortcutAction::Escape)
        );
        assert_eq!(
            ShortcutMap::resolve("Delete", Modifiers::NONE),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(ShortcutMap::resolve("z", Modifiers::NONE), None);
        assert_eq!(ShortcutMap::resolve("x", Modifiers::CTRL), None);
    }
}
