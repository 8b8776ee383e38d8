use crate::controller::editor::{Direction, Editor, LineDirection};
use crate::controller::movement::line_indices;
use crate::document_model::{Block, NodeHandle, SemicodeError, Sequence, decode, encode_blocks};

impl Editor {
    // Editing operations. Each runs as one edit (one reactive pass) and
    // reports the final caret once.

    /// Replaces the selection with `blocks`; the caret lands after them.
    pub fn insert_at_caret(&mut self, blocks: Vec<Block>) -> Vec<Block> {
        if blocks.is_empty() {
            return Vec::new();
        }
        let context = self.focused_context();
        let (start, end) = self.selection();
        let count = blocks.len();
        let removed = self.edit(|editor| {
            let removed = editor.splice_inner(&context, start, end - start, blocks);
            editor.state.set_caret(start + count);
            removed
        });
        self.notify_caret_moved();
        removed
    }

    /// Deletes the selection, or one block next to the caret.
    pub fn delete_at_caret(&mut self, direction: Direction) -> Vec<Block> {
        let context = self.focused_context();
        let len = context.len();
        let (start, end) = self.selection();
        let (start, count) = if end > start {
            (start, end - start)
        } else {
            match direction {
                Direction::Backwards if start > 0 => (start - 1, 1),
                Direction::Forwards if start < len => (start, 1),
                _ => return Vec::new(),
            }
        };

        let removed = self.edit(|editor| {
            let removed = editor.splice_inner(&context, start, count, Vec::new());
            editor.state.set_caret(start);
            removed
        });
        self.notify_caret_moved();
        removed
    }

    /// Wraps the selected blocks into one new nested sequence.
    pub fn nest_selection(&mut self) -> Sequence {
        let context = self.focused_context();
        let (start, end) = self.selection();
        let nested = Sequence::from_blocks(context.slice(start, end));
        let block = Block::Sequence(nested.clone());
        self.edit(|editor| {
            editor.splice_inner(&context, start, end - start, vec![block]);
            editor.state.set_caret(start + 1);
        });
        self.notify_caret_moved();
        nested
    }

    /// Splices the children of the nested sequence at `index` into its
    /// place. Returns `None` if that block is not a sequence.
    pub fn unnest_block(&mut self, index: usize) -> Option<Vec<Block>> {
        let removed = self.edit(|editor| editor.unnest_block_inner(index))?;
        self.notify_caret_moved();
        Some(removed)
    }

    /// Unnests every sequence intersecting the selection, including ones
    /// revealed by earlier unnesting.
    pub fn unnest(&mut self) {
        let context = self.focused_context();
        let changed = self.edit(|editor| {
            let mut changed = false;
            loop {
                let (start, end) = editor.selection();
                let found = context.blocks()[start..end].iter().position(Block::is_sequence);
                match found {
                    Some(offset) => {
                        editor.unnest_block_inner(start + offset);
                        changed = true;
                    }
                    None => break,
                }
            }
            changed
        });
        if changed {
            self.notify_caret_moved();
        }
    }

    fn unnest_block_inner(&mut self, index: usize) -> Option<Vec<Block>> {
        let context = self.focused_context();
        let child = match context.get(index) {
            Some(Block::Sequence(child)) => child,
            _ => return None,
        };
        let children = child.to_vec();
        let grown = children.len();
        // Offsets past the block move by the net change; offset `index` stays before it
        let shift = |position: usize| if position > index { position - 1 + grown } else { position };
        let caret = shift(self.state.caret_position);
        let select = shift(self.state.select_position);

        let removed = self.splice_inner(&context, index, 1, children);
        self.state.caret_position = caret;
        self.state.select_position = select;
        Some(removed)
    }

    /// Copies the lines spanned by the selection below (`Down`) or above
    /// (`Up`) themselves.
    pub fn duplicate_lines(&mut self, direction: LineDirection) {
        let context = self.focused_context();
        let len = context.len();
        let (start, end) = self.selected_lines();
        let mut lines: Vec<Block> = context.slice(start, end + 1).iter().map(Block::deep_clone).collect();

        self.edit(|editor| match direction {
            LineDirection::Down => {
                if end == len {
                    lines.insert(0, Block::Char('\n'));
                }
                let count = lines.len();
                editor.splice_inner(&context, end + 1, 0, lines);
                editor.state.caret_position += count;
                editor.state.select_position += count;
            }
            LineDirection::Up => {
                if end == len {
                    lines.push(Block::Char('\n'));
                }
                editor.splice_inner(&context, start, 0, lines);
            }
        });
        self.notify_caret_moved();
    }

    /// Deletes the caret's line together with its newline.
    pub fn delete_line_at_caret(&mut self) -> Vec<Block> {
        let context = self.focused_context();
        if context.is_empty() {
            return Vec::new();
        }
        let (line_start, line_end) = line_indices(&context, self.state.caret_position);
        let removed = self.edit(|editor| {
            let removed = editor.splice_inner(&context, line_start, line_end - line_start + 1, Vec::new());
            editor.state.set_caret(line_start);
            removed
        });
        self.notify_caret_moved();
        removed
    }

    /// Swaps the selected lines with the neighbouring line. The moved span
    /// always ends with a newline.
    pub fn move_lines(&mut self, direction: LineDirection) {
        let context = self.focused_context();
        let len = context.len();
        let (start, end) = self.selected_lines();
        let with_newline = |mut blocks: Vec<Block>| {
            if !blocks.last().is_some_and(Block::is_newline) {
                blocks.push(Block::Char('\n'));
            }
            blocks
        };

        match direction {
            LineDirection::Down => {
                if end == len {
                    return;
                }
                let (swap_start, swap_end) = line_indices(&context, end + 1);
                let step = swap_end - swap_start + 1;
                self.edit(|editor| {
                    let swapped = editor.splice_inner(&context, swap_start, step, Vec::new());
                    editor.splice_inner(&context, start, 0, with_newline(swapped));
                    editor.state.caret_position += step;
                    editor.state.select_position += step;
                });
            }
            LineDirection::Up => {
                if start == 0 {
                    return;
                }
                let (swap_start, _) = line_indices(&context, start - 1);
                // The removal clamps the caret, so the final offsets are fixed up front
                let distance = start - swap_start;
                let caret = self.state.caret_position - distance;
                let select = self.state.select_position - distance;
                self.edit(|editor| {
                    let moved = editor.splice_inner(&context, start, end - start + 1, Vec::new());
                    editor.splice_inner(&context, swap_start, 0, with_newline(moved));
                    editor.state.caret_position = caret;
                    editor.state.select_position = select;
                });
            }
        }
        self.notify_caret_moved();
    }

    /// Creates a handle with a fresh random payload and inserts it.
    pub fn insert_new_node(&mut self) -> NodeHandle {
        let handle = self.registry_mut().create_handle(None);
        self.insert_at_caret(vec![Block::Node(handle)]);
        handle
    }

    /// Semicode of the selected blocks.
    pub fn copy_selection(&self) -> Result<String, SemicodeError> {
        let (start, end) = self.selection();
        encode_blocks(&self.state.focused().slice(start, end), self.registry())
    }

    /// Decodes semicode and inserts it over the selection.
    pub fn paste_semicode(&mut self, text: &str) -> Result<(), SemicodeError> {
        let blocks = decode(text, self.registry_mut())?;
        self.insert_at_caret(blocks);
        Ok(())
    }
}
