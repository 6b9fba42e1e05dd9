//! Text processing and chunking functionality for studium
//!
//! This module splits raw course material into overlapping windows with
//! positional metadata, ready for embedding.

pub mod chunking;

// Re-export main types and functions
pub use chunking::{Chunk, DocumentText, TextChunker};
