//! Structured documents made of nestable blocks, with an embedded triple
//! notation and functions that recompute parts of the document after edits.

pub mod config;
pub mod controller;
pub mod document_model;
pub mod view;

pub use controller::Editor;
pub use document_model::{Block, HandleRegistry, NodeHandle, Sequence};
