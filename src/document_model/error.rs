use super::block::NodeHandle;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemicodeError {
    #[error("malformed embed length at offset {offset}")]
    MalformedEmbedLength { offset: usize },

    #[error("embed at offset {offset} declares {declared} characters but only {available} remain")]
    TruncatedEmbed {
        offset: usize,
        declared: usize,
        available: usize,
    },

    #[error("invalid hex payload at offset {offset}")]
    InvalidHexPayload { offset: usize },

    #[error("block cannot be encoded: {0}")]
    UnsupportedBlockType(String),

    #[error("node handle {0:?} was never registered")]
    UnknownHandle(NodeHandle),
}
