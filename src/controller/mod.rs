/// Controller subsystem - Editing, navigation and reactive recomputation
///
/// This module owns the editor state (context path, caret, selection), the
/// splice-based edit operations built on it, the reactive function pass and
/// the line-oriented command adapter used by edit scripts.

pub mod command;
pub mod edit_commands;
pub mod editor;
pub mod functions;
pub mod movement;

// Re-export public interface
pub use command::{CommandController, CommandError};
pub use editor::{
    CaretEvent, Direction, Editor, EditorState, EmbedDirection, LineDirection, SelectionMode, SpliceEvent,
};
pub use functions::{CHAIN_MARKER, FunctionCall, FunctionProcedure, TRIPLES_MARKER};
pub use movement::line_indices;
