pub mod board;
pub mod history;
pub mod input;
pub mod selection;
pub mod shortcuts;
pub mod template;
pub mod tools;

pub use board::{BoardConfig, BoardEngine, BoardEvent, CardOptions, LineDraft, NoteDigestEntry};
pub use history::History;
pub use input::{InputEvent, Modifiers, PointerButton};
pub use selection::{MarqueeGate, Selection};
pub use shortcuts::{ShortcutAction, ShortcutMap};
