//! Triple extraction: lines -> words -> (subject, predicate, object).
//!
//! A line is a maximal run between newline chars at the top level of a
//! sequence. Within a line, nested sequences contribute their own words in
//! place. A triple reads `subject LINK predicate LINK object`; the object of
//! one triple may open the next, so `a LINK b LINK c LINK d LINK e` yields
//! `(a, b, c)` and `(c, d, e)`.
use super::block::{Block, NodeHandle, Sequence};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Word {
    Text(String),
    Node(NodeHandle),
    Link,
    Label,
}

impl Word {
    pub fn is_link(&self) -> bool {
        matches!(self, Word::Link)
    }

    pub fn to_blocks(&self) -> Vec<Block> {
        match self {
            Word::Text(text) => text.chars().map(Block::Char).collect(),
            Word::Node(handle) => vec![Block::Node(*handle)],
            Word::Link => vec![Block::LinkMarker],
            Word::Label => vec![Block::LabelMarker],
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Text(text) => write!(f, "{text}"),
            Word::Node(handle) => write!(f, "#{:032x}", handle.as_u128()),
            Word::Link => write!(f, "->"),
            Word::Label => write!(f, "\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Word,
    pub predicate: Word,
    pub object: Word,
}

impl Triple {
    pub fn new(subject: Word, predicate: Word, object: Word) -> Self {
        Self { subject, predicate, object }
    }

    /// `subject SP predicate SP object`
    pub fn to_blocks(&self) -> Vec<Block> {
        let mut blocks = self.subject.to_blocks();
        blocks.push(Block::Char(' '));
        blocks.extend(self.predicate.to_blocks());
        blocks.push(Block::Char(' '));
        blocks.extend(self.object.to_blocks());
        blocks
    }
}

/// `[start, end)` of every newline-delimited line; the newline itself is
/// excluded and the final run is always present, even when empty.
pub fn line_spans(blocks: &[Block]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, block) in blocks.iter().enumerate() {
        if block.is_newline() {
            spans.push((start, i));
            start = i + 1;
        }
    }
    spans.push((start, blocks.len()));
    spans
}

/// Word stream of a run of blocks, flattening nested sequences in place.
pub fn words(blocks: &[Block]) -> Vec<Word> {
    let mut out = Vec::new();
    push_words(blocks, &mut out);
    out
}

fn push_words(blocks: &[Block], out: &mut Vec<Word>) {
    let mut run = String::new();
    let flush = |run: &mut String, out: &mut Vec<Word>| {
        if !run.is_empty() {
            out.push(Word::Text(std::mem::take(run)));
        }
    };

    for block in blocks {
        match block {
            Block::Char(' ' | '\t' | '\n') => flush(&mut run, out),
            Block::Char(c) => run.push(*c),
            Block::LinkMarker => {
                flush(&mut run, out);
                out.push(Word::Link);
            }
            Block::LabelMarker => {
                flush(&mut run, out);
                out.push(Word::Label);
            }
            Block::Node(handle) => {
                flush(&mut run, out);
                out.push(Word::Node(*handle));
            }
            Block::Sequence(seq) => {
                flush(&mut run, out);
                push_words(&seq.blocks(), out);
            }
        }
    }
    flush(&mut run, out);
}

/// Triples in one line's word stream, in encounter order.
pub fn triples_in_words(words: &[Word]) -> Vec<Triple> {
    let mut triples = Vec::new();
    let is_link = |i: usize| words.get(i).is_some_and(Word::is_link);
    let mut i = 0;

    while i < words.len() {
        if words[i].is_link() {
            i += 1;
            continue;
        }
        // A failed step resumes with the offending word as the next candidate
        if !is_link(i + 1) {
            i += 1;
            continue;
        }
        match words.get(i + 2) {
            None => break,
            Some(Word::Link) => {
                i += 2;
                continue;
            }
            Some(_) => {}
        }
        if !is_link(i + 3) {
            i += 3;
            continue;
        }
        match words.get(i + 4) {
            None => break,
            Some(Word::Link) => {
                i += 4;
                continue;
            }
            Some(object) => {
                triples.push(Triple::new(words[i].clone(), words[i + 2].clone(), object.clone()));
                i += 4;
            }
        }
    }
    triples
}

/// All triples of a sequence, line by line, duplicates included.
pub fn extract_triples(sequence: &Sequence) -> Vec<Triple> {
    let blocks = sequence.blocks();
    line_spans(&blocks)
        .into_iter()
        .flat_map(|(start, end)| triples_in_words(&words(&blocks[start..end])))
        .collect()
}

#[derive(PartialEq, Eq, Hash)]
enum KeyPart {
    Node(usize),
    Text(String),
    Link,
    Label,
}

/// Keeps the first occurrence of each triple. Handles are keyed by a
/// per-run id in first-seen order, text words by their literal value.
pub fn deduplicate_triples(triples: Vec<Triple>) -> Vec<Triple> {
    let mut ids: HashMap<NodeHandle, usize> = HashMap::new();
    let mut seen: HashSet<[KeyPart; 3]> = HashSet::new();
    let mut key_part = |word: &Word| match word {
        Word::Node(handle) => {
            let next = ids.len();
            KeyPart::Node(*ids.entry(*handle).or_insert(next))
        }
        Word::Text(text) => KeyPart::Text(text.clone()),
        Word::Link => KeyPart::Link,
        Word::Label => KeyPart::Label,
    };

    triples
        .into_iter()
        .filter(|triple| {
            let key = [
                key_part(&triple.subject),
                key_part(&triple.predicate),
                key_part(&triple.object),
            ];
            seen.insert(key)
        })
        .collect()
}

pub fn unique_triples(sequence: &Sequence) -> Vec<Triple> {
    deduplicate_triples(extract_triples(sequence))
}

/// Handle -> label text from `(handle, LABEL, text)` triples; first one wins.
pub fn labels(sequence: &Sequence) -> HashMap<NodeHandle, String> {
    let mut labels = HashMap::new();
    for triple in extract_triples(sequence) {
        if let (Word::Node(handle), Word::Label, Word::Text(text)) =
            (&triple.subject, &triple.predicate, &triple.object)
        {
            labels.entry(*handle).or_insert_with(|| text.clone());
        }
    }
    labels
}
