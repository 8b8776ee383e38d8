/// View Model - Abstracts document data for the view layer
/// The renderer only reads through this trait, never the editor internals
use crate::controller::Editor;
use crate::document_model::{HandleRegistry, NodeHandle, Sequence, labels};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CaretView {
    pub context: Sequence,
    pub caret_position: usize,
    pub select_position: usize,
}

impl CaretView {
    pub fn selection(&self) -> (usize, usize) {
        (
            self.caret_position.min(self.select_position),
            self.caret_position.max(self.select_position),
        )
    }
}

pub trait ViewModel {
    /// Root sequence to draw
    fn document(&self) -> &Sequence;

    /// Payload bytes of a handle, if registered
    fn payload(&self, handle: NodeHandle) -> Option<&[u8]>;

    /// Handle -> label text
    fn labels(&self) -> HashMap<NodeHandle, String> {
        labels(self.document())
    }

    /// Focused context with caret and selection, when there is one
    fn caret(&self) -> Option<CaretView> {
        None
    }
}

/// A decoded document with no editing state.
pub struct DocumentViewModel<'a> {
    document: &'a Sequence,
    registry: &'a HandleRegistry,
}

impl<'a> DocumentViewModel<'a> {
    pub fn new(document: &'a Sequence, registry: &'a HandleRegistry) -> Self {
        Self { document, registry }
    }
}

impl ViewModel for DocumentViewModel<'_> {
    fn document(&self) -> &Sequence {
        self.document
    }

    fn payload(&self, handle: NodeHandle) -> Option<&[u8]> {
        self.registry.bytes_of(handle).ok()
    }
}

pub struct EditorViewModel<'a> {
    editor: &'a Editor,
}

impl<'a> EditorViewModel<'a> {
    pub fn new(editor: &'a Editor) -> Self {
        Self { editor }
    }
}

impl ViewModel for EditorViewModel<'_> {
    fn document(&self) -> &Sequence {
        self.editor.document()
    }

    fn payload(&self, handle: NodeHandle) -> Option<&[u8]> {
        self.editor.registry().bytes_of(handle).ok()
    }

    fn caret(&self) -> Option<CaretView> {
        let state = self.editor.state();
        Some(CaretView {
            context: state.focused().clone(),
            caret_position: state.caret_position(),
            select_position: state.select_position(),
        })
    }
}
