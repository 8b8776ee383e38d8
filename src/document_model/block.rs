use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Code point standing in for a link marker in the text encoding.
pub const LINK: char = '\u{EEEE}';
/// Code point standing in for a label marker in the text encoding.
pub const LABEL: char = '\u{E001}';
/// Introduces a nested sequence embed: `EMBED <len> ':' <content>`.
pub const EMBED: char = '\u{EEEF}';
/// Introduces a byte payload embed: `EMBED_BYTES <count> ':' <hex>`.
pub const EMBED_BYTES: char = '\u{EEEA}';

/// Returns true for code points that can never appear as literal text.
pub fn is_reserved_char(c: char) -> bool {
    matches!(c, LINK | LABEL | EMBED | EMBED_BYTES)
}

/// Opaque 128-bit node identifier. Identity is the id itself; any payload
/// bytes live in the [`HandleRegistry`](super::registry::HandleRegistry).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(Uuid);

impl NodeHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl Default for NodeHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHandle({})", self.0.simple())
    }
}

/// A mutable, identity-carrying list of blocks.
///
/// Cloning a `Sequence` clones the reference, not the contents: both values
/// name the same context. Use [`Sequence::deep_clone`] for a distinct copy.
#[derive(Clone, Default)]
pub struct Sequence(Rc<RefCell<Vec<Block>>>);

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self(Rc::new(RefCell::new(blocks)))
    }

    /// Builds a flat sequence of `Char` blocks.
    pub fn from_text(text: &str) -> Self {
        Self::from_blocks(blocks_from_text(text))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Block> {
        self.0.borrow().get(index).cloned()
    }

    pub fn blocks(&self) -> Ref<'_, Vec<Block>> {
        self.0.borrow()
    }

    pub fn to_vec(&self) -> Vec<Block> {
        self.0.borrow().clone()
    }

    pub fn slice(&self, start: usize, end: usize) -> Vec<Block> {
        let blocks = self.0.borrow();
        let end = end.min(blocks.len());
        let start = start.min(end);
        blocks[start..end].to_vec()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Index of `child` among this sequence's direct elements, by identity.
    pub fn position_of(&self, child: &Sequence) -> Option<usize> {
        self.0
            .borrow()
            .iter()
            .position(|block| matches!(block, Block::Sequence(seq) if seq.ptr_eq(child)))
    }

    /// Same nesting shape, same chars and markers, same handle identities.
    pub fn structurally_eq(&self, other: &Sequence) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (a, b) = (self.0.borrow(), other.0.borrow());
        a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.structurally_eq(y))
    }

    /// Copies this sequence and every nested sequence into fresh identities.
    pub fn deep_clone(&self) -> Sequence {
        Sequence::from_blocks(self.0.borrow().iter().map(Block::deep_clone).collect())
    }

    /// Plain text of the direct `Char` elements, other blocks skipped.
    pub fn text(&self) -> String {
        self.0.borrow().iter().filter_map(Block::as_char).collect()
    }

    /// Raw splice with clamped bounds. Callers outside the crate mutate
    /// through the editor so that subscribers are notified.
    pub(crate) fn splice_raw(&self, start: usize, delete_count: usize, insert: Vec<Block>) -> Vec<Block> {
        let mut blocks = self.0.borrow_mut();
        let start = start.min(blocks.len());
        let end = start.saturating_add(delete_count).min(blocks.len());
        blocks.splice(start..end, insert).collect()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.borrow().iter()).finish()
    }
}

/// One atomic unit of document content.
#[derive(Clone)]
pub enum Block {
    Char(char),
    LinkMarker,
    LabelMarker,
    Node(NodeHandle),
    Sequence(Sequence),
}

impl Block {
    pub fn is_sequence(&self) -> bool {
        matches!(self, Block::Sequence(_))
    }

    pub fn is_char(&self) -> bool {
        matches!(self, Block::Char(_))
    }

    pub fn is_newline(&self) -> bool {
        matches!(self, Block::Char('\n'))
    }

    /// Word separators: space, tab and the two markers.
    pub fn is_separator(&self) -> bool {
        matches!(self, Block::Char(' ' | '\t') | Block::LinkMarker | Block::LabelMarker)
    }

    /// Separators plus newline; what caret word motion skips over.
    pub fn is_whitespace(&self) -> bool {
        self.is_separator() || self.is_newline()
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Block::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Block::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeHandle> {
        match self {
            Block::Node(handle) => Some(*handle),
            _ => None,
        }
    }

    pub fn structurally_eq(&self, other: &Block) -> bool {
        match (self, other) {
            (Block::Sequence(a), Block::Sequence(b)) => a.structurally_eq(b),
            _ => self == other,
        }
    }

    pub fn deep_clone(&self) -> Block {
        match self {
            Block::Sequence(seq) => Block::Sequence(seq.deep_clone()),
            other => other.clone(),
        }
    }
}

/// Chars and markers compare by value; handles and sequences by identity.
impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Block::Char(a), Block::Char(b)) => a == b,
            (Block::LinkMarker, Block::LinkMarker) => true,
            (Block::LabelMarker, Block::LabelMarker) => true,
            (Block::Node(a), Block::Node(b)) => a == b,
            (Block::Sequence(a), Block::Sequence(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Char(c) => write!(f, "{c:?}"),
            Block::LinkMarker => write!(f, "LINK"),
            Block::LabelMarker => write!(f, "LABEL"),
            Block::Node(handle) => write!(f, "{handle:?}"),
            Block::Sequence(seq) => write!(f, "{seq:?}"),
        }
    }
}

impl From<char> for Block {
    fn from(c: char) -> Self {
        Block::Char(c)
    }
}

impl From<NodeHandle> for Block {
    fn from(handle: NodeHandle) -> Self {
        Block::Node(handle)
    }
}

impl From<Sequence> for Block {
    fn from(seq: Sequence) -> Self {
        Block::Sequence(seq)
    }
}

pub fn blocks_from_text(text: &str) -> Vec<Block> {
    text.chars().map(Block::Char).collect()
}
