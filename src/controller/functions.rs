//! Reactive functions: marker handles whose target sequence is recomputed
//! from the whole document after every external edit.
//!
//! A marker line reads `MARKER arg... [target] ...`. Arguments are every
//! handle on the rest of the marker's line; the target is the first nested
//! sequence on it. A marker without a target is skipped. One pass runs per
//! external edit, left to right over the root, so a function sees the output
//! of functions before it but never triggers another pass.
use crate::controller::editor::Editor;
use crate::controller::movement::line_indices;
use crate::document_model::{Block, NodeHandle, Sequence, Word, extract_triples, unique_triples};
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, trace};

/// Writes the document's deduplicated triples into the target.
pub const TRIPLES_MARKER: NodeHandle = NodeHandle::from_u128(0x2832e221c14e355ae48e6b55c11412a5);

/// Walks `(source, relation)` through the triple graph into the target.
pub const CHAIN_MARKER: NodeHandle = NodeHandle::from_u128(0x988eadf6e2526898c25ed28ab4993e6a);

/// Recomputes a target's contents; `None` leaves the target untouched.
pub type FunctionProcedure = Rc<dyn Fn(&FunctionCall<'_>) -> Option<Vec<Block>>>;

pub struct FunctionCall<'a> {
    pub document: &'a Sequence,
    pub args: &'a [NodeHandle],
    pub target: &'a Sequence,
}

pub(crate) fn register_builtins(editor: &mut Editor) {
    for marker in [TRIPLES_MARKER, CHAIN_MARKER] {
        editor.registry_mut().register(marker, marker.as_u128().to_be_bytes().to_vec());
    }
    editor.register_function(TRIPLES_MARKER, materialize_triples);
    editor.register_function(CHAIN_MARKER, walk_chain);
}

/// One `subject predicate object` line per unique triple.
pub fn materialize_triples(call: &FunctionCall<'_>) -> Option<Vec<Block>> {
    let lines: Vec<Vec<Block>> = unique_triples(call.document).iter().map(|t| t.to_blocks()).collect();
    Some(lines.join(&Block::Char('\n')))
}

/// The chain from `source` along `relation`, space separated. Stops at a word
/// with no outgoing edge or on returning to a word already listed.
pub fn walk_chain(call: &FunctionCall<'_>) -> Option<Vec<Block>> {
    let [source, relation] = call.args else {
        return None;
    };
    let relation = Word::Node(*relation);
    let triples = extract_triples(call.document);

    let mut visited = HashSet::new();
    let mut chain = Vec::new();
    let mut current = Some(Word::Node(*source));
    while let Some(word) = current.take() {
        if !visited.insert(word.clone()) {
            break;
        }
        current = triples
            .iter()
            .find(|t| t.subject == word && t.predicate == relation)
            .map(|t| t.object.clone());
        chain.push(word.to_blocks());
    }
    Some(chain.join(&Block::Char(' ')))
}

impl Editor {
    pub fn unregister_function(&mut self, marker: NodeHandle) -> bool {
        self.functions.remove(&marker).is_some()
    }

    pub fn is_function_marker(&self, handle: NodeHandle) -> bool {
        self.functions.contains_key(&handle)
    }

    /// Runs one function pass over the root. Edits already do this; call it
    /// directly after loading a document or registering a function.
    pub fn apply_functions(&mut self) {
        if !self.functions_enabled || self.applying_functions || self.functions.is_empty() {
            return;
        }
        self.applying_functions = true;
        let document = self.document().clone();

        let mut index = 0;
        while index < document.len() {
            let procedure = match document.get(index) {
                Some(Block::Node(marker)) => self.functions.get(&marker).cloned(),
                _ => None,
            };
            let Some(procedure) = procedure else {
                index += 1;
                continue;
            };

            let (_, line_end) = line_indices(&document, index);
            let rest = document.slice(index + 1, line_end);
            let args: Vec<NodeHandle> = rest.iter().filter_map(Block::as_node).collect();
            let target = rest
                .iter()
                .enumerate()
                .find_map(|(offset, block)| block.as_sequence().map(|seq| (offset, seq.clone())));
            let Some((offset, target)) = target else {
                trace!(index, "function marker without target");
                index += 1;
                continue;
            };

            let call = FunctionCall { document: &document, args: &args, target: &target };
            if let Some(contents) = procedure(&call) {
                let current = target.to_vec();
                let unchanged = current.len() == contents.len()
                    && current.iter().zip(&contents).all(|(a, b)| a.structurally_eq(b));
                if !unchanged {
                    debug!(index, args = args.len(), len = contents.len(), "function rewrote target");
                    self.splice_inner(&target, 0, current.len(), contents);
                }
            }
            index += offset + 2;
        }
        self.applying_functions = false;
    }
}
