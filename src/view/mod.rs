/// View subsystem - Terminal rendering of block documents
///
/// The renderer draws through the ViewModel trait, so it never touches the
/// editor or registry directly.

pub mod renderer;
pub mod view_model;

// Re-export public interface
pub use renderer::{PALETTE, RenderOptions, View, handle_color};
pub use view_model::{CaretView, DocumentViewModel, EditorViewModel, ViewModel};
