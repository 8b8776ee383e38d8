use crate::controller::functions::{self, FunctionCall, FunctionProcedure};
use crate::document_model::{Block, HandleRegistry, NodeHandle, Sequence};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Whether a caret move drags the selection anchor along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    ClearSelection,
    KeepSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forwards,
    Backwards,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedDirection {
    Forwards,
    Backwards,
    Up,
}

/// Delivered to `on_splice` subscribers after every effective splice.
#[derive(Debug, Clone)]
pub struct SpliceEvent {
    pub context: Sequence,
    pub start: usize,
    pub delete_count: usize,
    pub inserted: Vec<Block>,
    pub removed: Vec<Block>,
}

/// Delivered to `on_caret_move` subscribers.
#[derive(Debug, Clone)]
pub struct CaretEvent {
    pub context: Sequence,
    pub caret_position: usize,
    pub select_position: usize,
}

pub type SpliceCallback = Box<dyn FnMut(&SpliceEvent)>;
pub type CaretCallback = Box<dyn FnMut(&CaretEvent)>;

/// Context path plus caret/select offsets into the focused context.
#[derive(Debug, Clone)]
pub struct EditorState {
    pub(crate) context_path: Vec<Sequence>,
    pub(crate) caret_position: usize,
    pub(crate) select_position: usize,
}

impl EditorState {
    pub fn new(root: Sequence) -> Self {
        Self {
            context_path: vec![root],
            caret_position: 0,
            select_position: 0,
        }
    }

    pub fn focused(&self) -> &Sequence {
        // The path is never empty; every mutation keeps at least the root
        &self.context_path[self.context_path.len() - 1]
    }

    pub fn context_path(&self) -> &[Sequence] {
        &self.context_path
    }

    pub fn caret_position(&self) -> usize {
        self.caret_position
    }

    pub fn select_position(&self) -> usize {
        self.select_position
    }

    /// Half-open `[min, max)` of caret and select positions.
    pub fn selection(&self) -> (usize, usize) {
        (
            self.caret_position.min(self.select_position),
            self.caret_position.max(self.select_position),
        )
    }

    pub fn has_selection(&self) -> bool {
        self.caret_position != self.select_position
    }

    pub(crate) fn set_caret(&mut self, position: usize) {
        self.caret_position = position;
        self.select_position = position;
    }

    fn clamp_to_focused(&mut self) {
        let len = self.focused().len();
        self.caret_position = self.caret_position.min(len);
        self.select_position = self.select_position.min(len);
    }
}

/// Owns the document, its caret state and the handle registry. Every
/// mutation of the document goes through [`Editor::splice`].
pub struct Editor {
    document: Sequence,
    pub(crate) state: EditorState,
    registry: HandleRegistry,
    splice_callbacks: Vec<SpliceCallback>,
    caret_callbacks: Vec<CaretCallback>,
    pub(crate) functions: HashMap<NodeHandle, FunctionProcedure>,
    pub(crate) functions_enabled: bool,
    pub(crate) applying_functions: bool,
    edit_depth: usize,
    document_changed: bool,
}

impl Editor {
    pub fn new() -> Self {
        Self::with_document(Sequence::new(), HandleRegistry::new())
    }

    /// Wraps an existing document. The built-in function markers are
    /// registered with the registry and the function table.
    pub fn with_document(document: Sequence, registry: HandleRegistry) -> Self {
        let mut editor = Self {
            state: EditorState::new(document.clone()),
            document,
            registry,
            splice_callbacks: Vec::new(),
            caret_callbacks: Vec::new(),
            functions: HashMap::new(),
            functions_enabled: true,
            applying_functions: false,
            edit_depth: 0,
            document_changed: false,
        };
        functions::register_builtins(&mut editor);
        editor
    }

    pub fn document(&self) -> &Sequence {
        &self.document
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HandleRegistry {
        &mut self.registry
    }

    pub fn focused_context(&self) -> Sequence {
        self.state.focused().clone()
    }

    pub fn context_path(&self) -> &[Sequence] {
        self.state.context_path()
    }

    pub fn caret_position(&self) -> usize {
        self.state.caret_position
    }

    pub fn select_position(&self) -> usize {
        self.state.select_position
    }

    pub fn selection(&self) -> (usize, usize) {
        self.state.selection()
    }

    pub fn on_splice(&mut self, callback: impl FnMut(&SpliceEvent) + 'static) {
        self.splice_callbacks.push(Box::new(callback));
    }

    pub fn on_caret_move(&mut self, callback: impl FnMut(&CaretEvent) + 'static) {
        self.caret_callbacks.push(Box::new(callback));
    }

    /// Binds a function marker handle to a recomputation procedure.
    pub fn register_function(
        &mut self,
        marker: NodeHandle,
        procedure: impl Fn(&FunctionCall<'_>) -> Option<Vec<Block>> + 'static,
    ) {
        self.functions.insert(marker, Rc::new(procedure));
    }

    pub fn set_functions_enabled(&mut self, enabled: bool) {
        self.functions_enabled = enabled;
    }

    pub fn functions_enabled(&self) -> bool {
        self.functions_enabled
    }

    /// Removes `delete_count` elements at `start` from `context` and inserts
    /// `insert` in their place, returning the removed elements. Subscribers
    /// and the reactive function pass run before this returns.
    pub fn splice(
        &mut self,
        context: &Sequence,
        start: usize,
        delete_count: usize,
        insert: Vec<Block>,
    ) -> Vec<Block> {
        self.edit(|editor| editor.splice_inner(context, start, delete_count, insert))
    }

    /// Runs `f` as one external edit: the reactive pass happens once, after
    /// the outermost edit finishes, and only if the document changed.
    pub(crate) fn edit<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.edit_depth += 1;
        let result = f(self);
        self.edit_depth -= 1;
        if self.edit_depth == 0 && self.document_changed && !self.applying_functions {
            self.apply_functions();
            self.document_changed = false;
        }
        result
    }

    pub(crate) fn splice_inner(
        &mut self,
        context: &Sequence,
        start: usize,
        delete_count: usize,
        insert: Vec<Block>,
    ) -> Vec<Block> {
        let len = context.len();
        let start = start.min(len);
        let delete_count = delete_count.min(len - start);
        if delete_count == 0 && insert.is_empty() {
            return Vec::new();
        }

        let removed = context.splice_raw(start, delete_count, insert.clone());
        self.document_changed = true;
        self.after_mutation(context);
        debug!(start, delete_count, inserted = insert.len(), "splice");

        let event = SpliceEvent {
            context: context.clone(),
            start,
            delete_count,
            inserted: insert,
            removed: removed.clone(),
        };
        for callback in &mut self.splice_callbacks {
            callback(&event);
        }
        removed
    }

    pub(crate) fn notify_caret_moved(&mut self) {
        let event = CaretEvent {
            context: self.state.focused().clone(),
            caret_position: self.state.caret_position,
            select_position: self.state.select_position,
        };
        trace!(caret = event.caret_position, select = event.select_position, "caret moved");
        for callback in &mut self.caret_callbacks {
            callback(&event);
        }
    }

    fn after_mutation(&mut self, context: &Sequence) {
        self.repair_context_path();
        if context.ptr_eq(self.state.focused()) {
            self.state.clamp_to_focused();
        }
    }

    /// Drops path entries whose parent no longer contains them.
    fn repair_context_path(&mut self) {
        let path = &self.state.context_path;
        let detached = (1..path.len()).find(|&k| path[k - 1].position_of(&path[k]).is_none());
        if let Some(k) = detached {
            debug!(depth = k, "focused context detached, ascending");
            self.state.context_path.truncate(k);
            self.state.clamp_to_focused();
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_model::blocks_from_text;
    use std::cell::RefCell;

    #[test]
    fn test_splice_changes_length_and_keeps_identity() {
        let mut editor = Editor::with_document(Sequence::from_text("hello"), HandleRegistry::new());
        let doc = editor.document().clone();
        let nested = Sequence::from_text("x");
        let insert = vec![Block::Char('A'), Block::Sequence(nested.clone())];

        let removed = editor.splice(&doc, 1, 3, insert.clone());
        assert_eq!(removed, blocks_from_text("ell"));
        assert_eq!(doc.len(), 5 + insert.len() - 3);
        assert_eq!(doc.slice(1, 3), insert);
        assert!(doc.get(2).unwrap().as_sequence().unwrap().ptr_eq(&nested));
    }

    #[test]
    fn test_empty_splice_emits_nothing() {
        let mut editor = Editor::new();
        let events = Rc::new(RefCell::new(0));
        let counter = events.clone();
        editor.on_splice(move |_| *counter.borrow_mut() += 1);

        let doc = editor.document().clone();
        assert!(editor.splice(&doc, 0, 0, Vec::new()).is_empty());
        assert!(editor.splice(&doc, 0, 4, Vec::new()).is_empty());
        assert_eq!(*events.borrow(), 0);

        editor.splice(&doc, 0, 0, blocks_from_text("ab"));
        assert_eq!(*events.borrow(), 1);
    }

    #[test]
    fn test_splice_notifies_subscribers_in_order() {
        let mut editor = Editor::with_document(Sequence::from_text("abc"), HandleRegistry::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = log.clone();
        editor.on_splice(move |event| {
            first.borrow_mut().push(format!("1:{}:{}:{}", event.start, event.delete_count, event.removed.len()))
        });
        let second = log.clone();
        editor.on_splice(move |event| second.borrow_mut().push(format!("2:{}", event.inserted.len())));

        let doc = editor.document().clone();
        editor.splice(&doc, 1, 1, blocks_from_text("XY"));
        assert_eq!(*log.borrow(), vec!["1:1:1:1".to_string(), "2:2".to_string()]);
    }

    #[test]
    fn test_splice_clamps_caret_in_focused_context() {
        let mut editor = Editor::with_document(Sequence::from_text("abcdef"), HandleRegistry::new());
        editor.state.caret_position = 6;
        editor.state.select_position = 4;
        let doc = editor.document().clone();
        editor.splice(&doc, 0, 4, Vec::new());
        assert_eq!(editor.caret_position(), 2);
        assert_eq!(editor.select_position(), 2);
    }

    #[test]
    fn test_detached_context_path_is_repaired() {
        let inner = Sequence::from_text("inner");
        let doc = Sequence::from_blocks(vec![Block::Char('a'), Block::Sequence(inner.clone())]);
        let mut editor = Editor::with_document(doc.clone(), HandleRegistry::new());
        editor.state.context_path.push(inner);
        editor.state.set_caret(4);

        editor.splice(&doc, 1, 1, Vec::new());
        assert_eq!(editor.context_path().len(), 1);
        assert!(editor.focused_context().ptr_eq(&doc));
        assert_eq!(editor.caret_position(), 1);
    }
}
