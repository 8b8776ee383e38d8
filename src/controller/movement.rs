use crate::controller::editor::{Direction, Editor, EmbedDirection, LineDirection, SelectionMode};
use crate::document_model::{Block, Sequence};
use tracing::trace;

/// `[start, end)` of the newline-delimited line containing `position`.
pub fn line_indices(context: &Sequence, position: usize) -> (usize, usize) {
    let blocks = context.blocks();
    let position = position.min(blocks.len());
    let mut start = position;
    while start > 0 && !blocks[start - 1].is_newline() {
        start -= 1;
    }
    let mut end = position;
    while end < blocks.len() && !blocks[end].is_newline() {
        end += 1;
    }
    (start, end)
}

impl Editor {
    // Caret movement methods - every public motion ends in exactly one
    // caret notification

    /// Moves the caret, optionally switching the focused context first.
    /// `position` is clamped into the focused context.
    pub fn move_caret(&mut self, position: isize, mode: SelectionMode, context_path: Option<Vec<Sequence>>) {
        if let Some(path) = context_path {
            self.switch_context_path(path);
        }
        let len = self.state.focused().len();
        let position = position.clamp(0, len as isize) as usize;
        self.set_caret_position(position, mode);
        self.notify_caret_moved();
    }

    /// Arrow-key motion relative to the current caret.
    pub fn move_caret_by(&mut self, delta: isize, mode: SelectionMode) {
        let position = (self.state.caret_position as isize).saturating_add(delta);
        self.move_caret(position, mode, None);
    }

    pub fn move_caret_line_start(&mut self, mode: SelectionMode) {
        let (start, _) = line_indices(self.state.focused(), self.state.caret_position);
        self.move_caret_to(start, mode);
    }

    pub fn move_caret_line_end(&mut self, mode: SelectionMode) {
        let (_, end) = line_indices(self.state.focused(), self.state.caret_position);
        self.move_caret_to(end, mode);
    }

    /// Full lines spanned by the selection, as `[start, end)` where `end`
    /// is the index of the closing newline or the context length.
    pub fn selected_lines(&self) -> (usize, usize) {
        let context = self.state.focused();
        let (selection_start, selection_end) = self.state.selection();
        let (start, _) = line_indices(context, selection_start);
        let (_, end) = line_indices(context, selection_end);
        (start, end)
    }

    /// Skips the current word, then the whitespace after it. A word also
    /// ends where a char run meets a run of non-char blocks.
    pub fn move_caret_word(&mut self, direction: Direction, mode: SelectionMode) {
        let context = self.focused_context();
        let blocks = context.blocks();
        let len = blocks.len();
        let mut i = self.state.caret_position;

        match direction {
            Direction::Forwards => {
                if i < len && !blocks[i].is_whitespace() {
                    let in_text = blocks[i].is_char();
                    while i < len && !blocks[i].is_whitespace() && blocks[i].is_char() == in_text {
                        i += 1;
                    }
                }
                while i < len && blocks[i].is_whitespace() {
                    i += 1;
                }
            }
            Direction::Backwards => {
                while i > 0 && blocks[i - 1].is_whitespace() {
                    i -= 1;
                }
                if i > 0 {
                    let in_text = blocks[i - 1].is_char();
                    while i > 0 && !blocks[i - 1].is_whitespace() && blocks[i - 1].is_char() == in_text {
                        i -= 1;
                    }
                }
            }
        }
        drop(blocks);
        self.move_caret_to(i, mode);
    }

    /// Moves to the same column of the adjacent line, clamped to its length.
    pub fn move_caret_line(&mut self, direction: LineDirection, mode: SelectionMode) {
        let context = self.focused_context();
        let len = context.len();
        let caret = self.state.caret_position;
        let (line_start, line_end) = line_indices(&context, caret);

        let target = match direction {
            LineDirection::Up if line_start == 0 => 0,
            LineDirection::Down if line_end == len => len,
            _ => {
                let column = caret - line_start;
                let neighbour = match direction {
                    LineDirection::Down => line_end + 1,
                    LineDirection::Up => line_start - 1,
                };
                let (target_start, target_end) = line_indices(&context, neighbour);
                (target_start + column).min(target_end)
            }
        };
        self.move_caret_to(target, mode);
    }

    /// Steps one block, entering a nested sequence under the caret or leaving
    /// the focused one at its boundary. `Up` always leaves one level.
    pub fn move_caret_across_embed(&mut self, direction: EmbedDirection) {
        let context = self.focused_context();
        let caret = self.state.caret_position;
        let len = context.len();
        let nested_at = |index: usize| match context.get(index) {
            Some(Block::Sequence(child)) => Some(child),
            _ => None,
        };

        let position = match direction {
            EmbedDirection::Forwards => {
                if let Some(child) = nested_at(caret) {
                    self.state.context_path.push(child);
                    0
                } else if caret == len && self.state.context_path.len() > 1 {
                    self.ascend().map_or(caret, |index| index + 1)
                } else {
                    (caret + 1).min(len)
                }
            }
            EmbedDirection::Backwards => {
                if let Some(child) = caret.checked_sub(1).and_then(nested_at) {
                    let child_len = child.len();
                    self.state.context_path.push(child);
                    child_len
                } else if caret == 0 && self.state.context_path.len() > 1 {
                    self.ascend().unwrap_or(0)
                } else {
                    caret.saturating_sub(1)
                }
            }
            EmbedDirection::Up => self.ascend().unwrap_or(caret),
        };
        self.state.set_caret(position);
        self.notify_caret_moved();
    }

    /// Selects the maximal non-whitespace run around `position`; a no-op on
    /// whitespace or past the end.
    pub fn select_word_at_position(&mut self, position: usize, context_path: Option<Vec<Sequence>>) {
        if let Some(path) = context_path {
            self.switch_context_path(path);
        }
        let context = self.focused_context();
        let blocks = context.blocks();
        match blocks.get(position) {
            Some(block) if !block.is_whitespace() => {}
            _ => return,
        }

        let mut word_start = position;
        while word_start > 0 && !blocks[word_start - 1].is_whitespace() {
            word_start -= 1;
        }
        let mut word_end = position;
        while word_end < blocks.len() && !blocks[word_end].is_whitespace() {
            word_end += 1;
        }
        drop(blocks);

        self.state.select_position = word_start;
        self.state.caret_position = word_end;
        self.notify_caret_moved();
    }

    pub fn select_all(&mut self) {
        let len = self.state.focused().len();
        if self.state.select_position == 0 && self.state.caret_position == len {
            return;
        }
        self.state.select_position = 0;
        self.state.caret_position = len;
        self.notify_caret_moved();
    }

    pub fn deselect(&mut self) {
        if !self.state.has_selection() {
            return;
        }
        self.state.select_position = self.state.caret_position;
        self.notify_caret_moved();
    }

    fn move_caret_to(&mut self, position: usize, mode: SelectionMode) {
        self.move_caret(position.min(isize::MAX as usize) as isize, mode, None);
    }

    fn set_caret_position(&mut self, position: usize, mode: SelectionMode) {
        self.state.caret_position = position;
        match mode {
            SelectionMode::ClearSelection => self.state.select_position = position,
            SelectionMode::KeepSelection => {
                let len = self.state.focused().len();
                self.state.select_position = self.state.select_position.min(len);
            }
        }
    }

    fn switch_context_path(&mut self, path: Vec<Sequence>) {
        // Only a chain of nested sequences rooted at the document can gain focus
        let rooted = path.first().is_some_and(|root| root.ptr_eq(self.document()));
        if !rooted || !path.windows(2).all(|pair| pair[0].position_of(&pair[1]).is_some()) {
            trace!(depth = path.len(), "ignoring context path outside the document");
            return;
        }
        let unchanged = path.len() == self.state.context_path.len()
            && path.iter().zip(&self.state.context_path).all(|(a, b)| a.ptr_eq(b));
        if !unchanged {
            self.state.context_path = path;
        }
    }

    /// Pops the focused context; returns its index in the new focused context.
    fn ascend(&mut self) -> Option<usize> {
        if self.state.context_path.len() < 2 {
            return None;
        }
        let child = self.state.context_path.pop()?;
        let parent = self.state.focused();
        Some(parent.position_of(&child).unwrap_or(parent.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::editor::CaretEvent;
    use crate::document_model::{HandleRegistry, NodeHandle, blocks_from_text};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn editor_with(text: &str) -> Editor {
        Editor::with_document(Sequence::from_text(text), HandleRegistry::new())
    }

    fn record_moves(editor: &mut Editor) -> Rc<RefCell<Vec<(usize, usize)>>> {
        let moves = Rc::new(RefCell::new(Vec::new()));
        let sink = moves.clone();
        editor.on_caret_move(move |event: &CaretEvent| {
            sink.borrow_mut().push((event.caret_position, event.select_position))
        });
        moves
    }

    #[test]
    fn test_line_indices() {
        let seq = Sequence::from_text("ab\ncd\n");
        assert_eq!(line_indices(&seq, 0), (0, 2));
        assert_eq!(line_indices(&seq, 2), (0, 2));
        assert_eq!(line_indices(&seq, 4), (3, 5));
        assert_eq!(line_indices(&seq, 6), (6, 6));
        assert_eq!(line_indices(&seq, 99), (6, 6));
    }

    #[test]
    fn test_move_caret_clamps() {
        let mut editor = editor_with("0123456789");
        editor.move_caret(-5, SelectionMode::ClearSelection, None);
        assert_eq!(editor.caret_position(), 0);
        editor.move_caret(999, SelectionMode::ClearSelection, None);
        assert_eq!(editor.caret_position(), 10);
        assert_eq!(editor.select_position(), 10);
    }

    #[test]
    fn test_move_caret_keep_selection() {
        let mut editor = editor_with("hello");
        editor.move_caret(1, SelectionMode::ClearSelection, None);
        editor.move_caret(4, SelectionMode::KeepSelection, None);
        assert_eq!(editor.selection(), (1, 4));
        editor.move_caret_by(-1, SelectionMode::KeepSelection);
        assert_eq!(editor.selection(), (1, 3));
    }

    #[test]
    fn test_move_caret_switches_context() {
        let inner = Sequence::from_text("xyz");
        let doc = Sequence::from_blocks(vec![Block::Char('a'), Block::Sequence(inner.clone())]);
        let mut editor = Editor::with_document(doc.clone(), HandleRegistry::new());
        let moves = record_moves(&mut editor);

        editor.move_caret(10, SelectionMode::ClearSelection, Some(vec![doc, inner.clone()]));
        assert!(editor.focused_context().ptr_eq(&inner));
        assert_eq!(editor.caret_position(), 3);
        assert_eq!(*moves.borrow(), vec![(3, 3)]);
    }

    #[test]
    fn test_move_caret_ignores_foreign_context() {
        let inner = Sequence::from_text("xyz");
        let doc = Sequence::from_blocks(vec![Block::Char('a'), Block::Sequence(inner.clone())]);
        let mut editor = Editor::with_document(doc.clone(), HandleRegistry::new());
        let stray = Sequence::from_text("stray");

        editor.move_caret(0, SelectionMode::ClearSelection, Some(vec![stray.clone()]));
        assert!(editor.focused_context().ptr_eq(&doc));
        editor.move_caret(0, SelectionMode::ClearSelection, Some(vec![doc.clone(), stray.clone()]));
        assert!(editor.focused_context().ptr_eq(&doc));
        editor.select_word_at_position(0, Some(vec![inner, doc.clone()]));
        assert!(editor.focused_context().ptr_eq(&doc));

        editor.move_caret(0, SelectionMode::ClearSelection, None);
        editor.insert_at_caret(vec![Block::Char('X')]);
        assert_eq!(stray.text(), "stray");
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.get(0), Some(Block::Char('X')));
    }

    #[test]
    fn test_move_caret_line_keeps_column() {
        let mut editor = editor_with("ab\ncd\n");
        editor.move_caret(1, SelectionMode::ClearSelection, None);
        editor.move_caret_line(LineDirection::Down, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 4);
        editor.move_caret_line(LineDirection::Up, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 1);
    }

    #[test]
    fn test_move_caret_line_clamps_column_and_boundaries() {
        let mut editor = editor_with("abcd\nx\nlonger");
        editor.move_caret(3, SelectionMode::ClearSelection, None);
        editor.move_caret_line(LineDirection::Down, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 6);

        editor.move_caret_line(LineDirection::Up, SelectionMode::ClearSelection);
        editor.move_caret_line(LineDirection::Up, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 0);

        editor.move_caret(8, SelectionMode::ClearSelection, None);
        editor.move_caret_line(LineDirection::Down, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 13);
    }

    #[test]
    fn test_line_start_and_end() {
        let mut editor = editor_with("one\ntwo three\n");
        editor.move_caret(6, SelectionMode::ClearSelection, None);
        editor.move_caret_line_end(SelectionMode::KeepSelection);
        assert_eq!(editor.selection(), (6, 13));
        editor.move_caret_line_start(SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 4);
    }

    #[test]
    fn test_word_motion_over_text() {
        let mut editor = editor_with("alpha  beta\tgamma");
        editor.move_caret_word(Direction::Forwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 7);
        editor.move_caret_word(Direction::Forwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 12);
        editor.move_caret_word(Direction::Forwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 17);
        editor.move_caret_word(Direction::Backwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 12);
        editor.move_caret_word(Direction::Backwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 7);
    }

    #[test]
    fn test_word_motion_stops_at_block_runs() {
        let h = NodeHandle::new();
        let mut blocks = blocks_from_text("ab");
        blocks.push(Block::Node(h));
        blocks.push(Block::Node(h));
        blocks.extend(blocks_from_text("cd ef"));
        let mut editor = Editor::with_document(Sequence::from_blocks(blocks), HandleRegistry::new());

        editor.move_caret_word(Direction::Forwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 2);
        editor.move_caret_word(Direction::Forwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 4);
        editor.move_caret_word(Direction::Forwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 7);
        editor.move_caret_word(Direction::Backwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 4);
        editor.move_caret_word(Direction::Backwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 2);
    }

    #[test]
    fn test_word_motion_skips_markers() {
        let mut blocks = blocks_from_text("a");
        blocks.push(Block::LinkMarker);
        blocks.extend(blocks_from_text("b"));
        let mut editor = Editor::with_document(Sequence::from_blocks(blocks), HandleRegistry::new());
        editor.move_caret_word(Direction::Forwards, SelectionMode::ClearSelection);
        assert_eq!(editor.caret_position(), 2);
    }

    #[test]
    fn test_embed_crossing() {
        let inner = Sequence::from_text("xy");
        let doc = Sequence::from_blocks(vec![Block::Char('a'), Block::Sequence(inner.clone()), Block::Char('b')]);
        let mut editor = Editor::with_document(doc.clone(), HandleRegistry::new());

        editor.move_caret_across_embed(EmbedDirection::Forwards);
        assert_eq!(editor.caret_position(), 1);
        editor.move_caret_across_embed(EmbedDirection::Forwards);
        assert!(editor.focused_context().ptr_eq(&inner));
        assert_eq!(editor.caret_position(), 0);

        editor.move_caret_across_embed(EmbedDirection::Forwards);
        editor.move_caret_across_embed(EmbedDirection::Forwards);
        assert_eq!(editor.caret_position(), 2);
        editor.move_caret_across_embed(EmbedDirection::Forwards);
        assert!(editor.focused_context().ptr_eq(&doc));
        assert_eq!(editor.caret_position(), 2);

        editor.move_caret_across_embed(EmbedDirection::Backwards);
        assert!(editor.focused_context().ptr_eq(&inner));
        assert_eq!(editor.caret_position(), 2);
        editor.move_caret_across_embed(EmbedDirection::Up);
        assert!(editor.focused_context().ptr_eq(&doc));
        assert_eq!(editor.caret_position(), 1);

        editor.move_caret_across_embed(EmbedDirection::Up);
        assert_eq!(editor.context_path().len(), 1);
        assert_eq!(editor.caret_position(), 1);
    }

    #[test]
    fn test_embed_backwards_exits_at_start() {
        let inner = Sequence::from_text("xy");
        let doc = Sequence::from_blocks(vec![Block::Char('a'), Block::Sequence(inner.clone())]);
        let mut editor = Editor::with_document(doc.clone(), HandleRegistry::new());
        editor.move_caret(0, SelectionMode::ClearSelection, Some(vec![doc.clone(), inner]));
        editor.move_caret_across_embed(EmbedDirection::Backwards);
        assert!(editor.focused_context().ptr_eq(&doc));
        assert_eq!(editor.caret_position(), 1);
    }

    #[test]
    fn test_select_word_at_position() {
        let mut editor = editor_with("foo bar\nbaz");
        let moves = record_moves(&mut editor);
        editor.select_word_at_position(5, None);
        assert_eq!(editor.select_position(), 4);
        assert_eq!(editor.caret_position(), 7);

        editor.select_word_at_position(3, None);
        editor.select_word_at_position(7, None);
        editor.select_word_at_position(50, None);
        assert_eq!(moves.borrow().len(), 1);
    }

    #[test]
    fn test_select_all_and_deselect_are_idempotent() {
        let mut editor = editor_with("abc");
        let moves = record_moves(&mut editor);
        editor.select_all();
        editor.select_all();
        assert_eq!(editor.selection(), (0, 3));
        editor.deselect();
        editor.deselect();
        assert_eq!(editor.selection(), (3, 3));
        assert_eq!(*moves.borrow(), vec![(3, 0), (3, 3)]);
    }

    #[test]
    fn test_selected_lines() {
        let mut editor = editor_with("ab\ncd\nef");
        editor.move_caret(1, SelectionMode::ClearSelection, None);
        editor.move_caret(4, SelectionMode::KeepSelection, None);
        assert_eq!(editor.selected_lines(), (0, 5));
    }
}
