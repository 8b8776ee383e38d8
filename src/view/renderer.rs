use super::view_model::{CaretView, ViewModel};
use crate::document_model::semicode::to_hex;
use crate::document_model::{Block, NodeHandle, Sequence, Word, unique_triples};
use crossterm::{
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::{self, Write};

/// Swatch colors for handles, picked by the first byte of the payload's SHA-256.
pub const PALETTE: [Color; 8] = [
    Color::Yellow,
    Color::Rgb { r: 255, g: 165, b: 0 },
    Color::Red,
    Color::Magenta,
    Color::Rgb { r: 238, g: 130, b: 238 },
    Color::Blue,
    Color::Cyan,
    Color::Green,
];

/// Payloads up to this length are shown as hex instead of a swatch.
const SHORT_PAYLOAD: usize = 2;

pub fn handle_color(payload: &[u8]) -> Color {
    let digest = Sha256::digest(payload);
    PALETTE[usize::from(digest[0]) % PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub color: bool,
    pub show_whitespace: bool,
    pub labels: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: true,
            show_whitespace: false,
            labels: true,
        }
    }
}

/// Per-render lookups shared by every nesting level.
struct Frame<'a> {
    view_model: &'a dyn ViewModel,
    labels: HashMap<NodeHandle, String>,
    caret: Option<CaretView>,
}

pub struct View {
    options: RenderOptions,
}

impl View {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    pub fn set_color(&mut self, color: bool) {
        self.options.color = color;
    }

    pub fn set_show_whitespace(&mut self, show: bool) {
        self.options.show_whitespace = show;
    }

    pub fn set_labels(&mut self, labels: bool) {
        self.options.labels = labels;
    }

    /// Draws the whole document. Nested sequences are bracketed; with color
    /// on, the selection is reversed and the caret drawn as a bar.
    pub fn render<W: Write>(&self, view_model: &dyn ViewModel, out: &mut W) -> io::Result<()> {
        let frame = self.frame(view_model);
        self.render_sequence(&frame, view_model.document(), 0, out)?;
        if self.options.color {
            queue!(out, SetAttribute(Attribute::Reset))?;
        }
        out.flush()
    }

    pub fn render_to_string(&self, view_model: &dyn ViewModel) -> io::Result<String> {
        let mut out = Vec::new();
        self.render(view_model, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// One `subject predicate object` line per unique triple.
    pub fn render_triples<W: Write>(&self, view_model: &dyn ViewModel, out: &mut W) -> io::Result<()> {
        let frame = self.frame(view_model);
        for triple in unique_triples(view_model.document()) {
            let parts = [&triple.subject, &triple.predicate, &triple.object].map(|word| self.word_text(&frame, word));
            writeln!(out, "{}", parts.join(" "))?;
        }
        out.flush()
    }

    fn frame<'a>(&self, view_model: &'a dyn ViewModel) -> Frame<'a> {
        let labels = if self.options.labels {
            view_model.labels()
        } else {
            HashMap::new()
        };
        Frame {
            view_model,
            labels,
            caret: view_model.caret(),
        }
    }

    fn render_sequence<W: Write>(&self, frame: &Frame<'_>, sequence: &Sequence, depth: usize, out: &mut W) -> io::Result<()> {
        let focused = frame.caret.as_ref().filter(|caret| caret.context.ptr_eq(sequence));
        let (select_start, select_end) = focused.map_or((0, 0), CaretView::selection);
        let draw_caret = self.options.color && focused.is_some_and(|caret| caret.caret_position == caret.select_position);

        if depth > 0 {
            self.emit(out, "[", Some(Color::DarkGrey), None)?;
        }
        let blocks = sequence.blocks();
        for (index, block) in blocks.iter().enumerate() {
            if draw_caret && focused.is_some_and(|caret| caret.caret_position == index) {
                self.emit(out, "│", Some(Color::White), None)?;
            }
            let selected = self.options.color && index >= select_start && index < select_end;
            if selected {
                queue!(out, SetAttribute(Attribute::Reverse))?;
            }
            self.render_block(frame, block, depth, out)?;
            if selected {
                queue!(out, SetAttribute(Attribute::NoReverse))?;
            }
        }
        if draw_caret && focused.is_some_and(|caret| caret.caret_position >= blocks.len()) {
            self.emit(out, "│", Some(Color::White), None)?;
        }
        if depth > 0 {
            self.emit(out, "]", Some(Color::DarkGrey), None)?;
        }
        Ok(())
    }

    fn render_block<W: Write>(&self, frame: &Frame<'_>, block: &Block, depth: usize, out: &mut W) -> io::Result<()> {
        let whitespace = self.options.show_whitespace;
        match block {
            Block::Char('\n') if whitespace => {
                self.emit(out, "¶", Some(Color::DarkGrey), None)?;
                queue!(out, Print('\n'))
            }
            Block::Char('\t') if whitespace => self.emit(out, "» ", Some(Color::DarkGrey), None),
            Block::Char(' ') if whitespace => self.emit(out, "·", Some(Color::DarkGrey), None),
            Block::Char(c) => queue!(out, Print(c)),
            Block::LinkMarker => self.emit(out, "➤", Some(Color::Cyan), None),
            Block::LabelMarker => self.emit(out, "\"", Some(Color::Yellow), None),
            Block::Node(handle) => {
                let payload = frame.view_model.payload(*handle);
                let swatch = payload.filter(|bytes| bytes.len() > SHORT_PAYLOAD).map(handle_color);
                match (frame.labels.get(handle), swatch) {
                    (Some(label), swatch) => self.emit(out, label, Some(Color::Black).filter(|_| swatch.is_some()), swatch),
                    (None, Some(color)) if self.options.color => self.emit(out, "  ", None, Some(color)),
                    (None, _) => self.emit(out, &self.node_text(payload), Some(Color::DarkYellow), None),
                }
            }
            Block::Sequence(child) => self.render_sequence(frame, child, depth + 1, out),
        }
    }

    /// Hex for short payloads, otherwise `#` and the first four payload bytes.
    fn node_text(&self, payload: Option<&[u8]>) -> String {
        match payload {
            Some(bytes) if bytes.len() <= SHORT_PAYLOAD => to_hex(bytes),
            Some(bytes) => format!("#{}", to_hex(&bytes[..bytes.len().min(4)])),
            None => "#?".to_string(),
        }
    }

    fn word_text(&self, frame: &Frame<'_>, word: &Word) -> String {
        match word {
            Word::Text(text) => text.clone(),
            Word::Node(handle) => match frame.labels.get(handle) {
                Some(label) => label.clone(),
                None => self.node_text(frame.view_model.payload(*handle)),
            },
            Word::Link => "➤".to_string(),
            Word::Label => "\"".to_string(),
        }
    }

    fn emit<W: Write>(&self, out: &mut W, text: &str, fg: Option<Color>, bg: Option<Color>) -> io::Result<()> {
        if !self.options.color || (fg.is_none() && bg.is_none()) {
            return queue!(out, Print(text));
        }
        if let Some(color) = fg {
            queue!(out, SetForegroundColor(color))?;
        }
        if let Some(color) = bg {
            queue!(out, SetBackgroundColor(color))?;
        }
        queue!(out, Print(text), ResetColor)
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Editor, SelectionMode};
    use crate::document_model::{HandleRegistry, blocks_from_text};
    use crate::view::view_model::{DocumentViewModel, EditorViewModel};

    fn plain() -> View {
        View::new(RenderOptions {
            color: false,
            ..RenderOptions::default()
        })
    }

    fn show(view: &View, document: &Sequence, registry: &HandleRegistry) -> String {
        view.render_to_string(&DocumentViewModel::new(document, registry)).unwrap()
    }

    #[test]
    fn test_plain_text_and_nesting() {
        let doc = Sequence::from_blocks(vec![
            Block::Char('a'),
            Block::Sequence(Sequence::from_blocks(vec![
                Block::Char('b'),
                Block::Sequence(Sequence::from_text("c")),
            ])),
            Block::Char('d'),
        ]);
        assert_eq!(show(&plain(), &doc, &HandleRegistry::new()), "a[b[c]]d");
    }

    #[test]
    fn test_markers_and_whitespace() {
        let mut blocks = blocks_from_text("a b\tc\nd");
        blocks.push(Block::LinkMarker);
        blocks.push(Block::LabelMarker);
        let doc = Sequence::from_blocks(blocks);
        let registry = HandleRegistry::new();

        let mut view = plain();
        assert_eq!(show(&view, &doc, &registry), "a b\tc\nd➤\"");
        view.set_show_whitespace(true);
        assert_eq!(show(&view, &doc, &registry), "a·b» c¶\nd➤\"");
    }

    #[test]
    fn test_node_rendering() {
        let mut registry = HandleRegistry::new();
        let short = registry.create_handle(Some(vec![0x0a, 0xff]));
        let long = registry.create_handle(Some(vec![0xde, 0xad, 0xbe, 0xef, 0x01]));
        let unknown = NodeHandle::new();
        let doc = Sequence::from_blocks(vec![Block::Node(short), Block::Node(long), Block::Node(unknown)]);
        assert_eq!(show(&plain(), &doc, &registry), "0aff#deadbeef#?");
    }

    #[test]
    fn test_labelled_node() {
        let mut registry = HandleRegistry::new();
        let node = registry.create_handle(None);
        let mut blocks = vec![Block::Node(node), Block::LinkMarker, Block::LabelMarker, Block::LinkMarker];
        blocks.extend(blocks_from_text("Ann"));
        let doc = Sequence::from_blocks(blocks);

        let mut view = plain();
        assert_eq!(show(&view, &doc, &registry), "Ann➤\"➤Ann");
        view.set_labels(false);
        assert!(show(&view, &doc, &registry).starts_with('#'));
    }

    #[test]
    fn test_handle_color_is_stable() {
        let payload = [1u8, 2, 3, 4];
        assert_eq!(handle_color(&payload), handle_color(&payload));
        assert!(PALETTE.contains(&handle_color(&payload)));
    }

    #[test]
    fn test_color_output_uses_swatches() {
        let mut registry = HandleRegistry::new();
        let node = registry.create_handle(Some(vec![7; 16]));
        let doc = Sequence::from_blocks(vec![Block::Node(node)]);
        let out = show(&View::default(), &doc, &registry);
        assert!(out.contains("\u{1b}["));
        assert!(out.contains("  "));
        assert!(!out.contains('#'));
    }

    #[test]
    fn test_selection_and_caret() {
        let mut editor = Editor::with_document(Sequence::from_text("abc"), HandleRegistry::new());
        editor.move_caret(1, SelectionMode::ClearSelection, None);
        editor.move_caret(3, SelectionMode::KeepSelection, None);

        let colored = View::default().render_to_string(&EditorViewModel::new(&editor)).unwrap();
        assert!(colored.contains("\u{1b}[7m"));
        assert!(!colored.contains('│'));

        editor.deselect();
        let colored = View::default().render_to_string(&EditorViewModel::new(&editor)).unwrap();
        assert!(colored.contains('│'));

        assert_eq!(plain().render_to_string(&EditorViewModel::new(&editor)).unwrap(), "abc");
    }

    #[test]
    fn test_render_triples() {
        let mut registry = HandleRegistry::new();
        let node = registry.create_handle(Some(vec![0x01]));
        let mut blocks = blocks_from_text("alice");
        blocks.push(Block::LinkMarker);
        blocks.extend(blocks_from_text("knows"));
        blocks.push(Block::LinkMarker);
        blocks.push(Block::Node(node));
        let doc = Sequence::from_blocks(blocks);

        let mut out = Vec::new();
        plain().render_triples(&DocumentViewModel::new(&doc, &registry), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "alice knows 01\n");
    }
}
