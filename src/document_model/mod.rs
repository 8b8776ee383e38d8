/// Document model subsystem - Core data structures and encodings
///
/// This module contains the recursive block sequence, the node handle registry,
/// the semicode text encoding and the triple grammar read from block streams.

pub mod block;
pub mod error;
pub mod registry;
pub mod semicode;
pub mod triples;

// Re-export main types for convenience
pub use block::{Block, NodeHandle, Sequence, blocks_from_text};
pub use error::SemicodeError;
pub use registry::HandleRegistry;
pub use semicode::{decode, decode_sequence, encode, encode_blocks};
pub use triples::{Triple, Word, extract_triples, labels, line_spans, unique_triples};
