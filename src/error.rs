//! Error types for studium
//!
//! This module provides the error taxonomy for the retrieval and scheduling
//! core: ingestion, index storage, retrieval, and answer generation.

use thiserror::Error;

/// Main error type for studium operations
#[derive(Error, Debug)]
pub enum StudiumError {
    /// Text processing errors
    #[error("Text processing error: {0}")]
    TextProcessing(String),

    /// Embedding backend unavailable or nothing to embed; ingestion aborts
    /// without publishing a partial index
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The requested document has no persisted index; callers treat the
    /// document as unprocessed, not as a hard failure
    #[error("Index not found for document '{0}'")]
    IndexNotFound(String),

    /// None of the requested documents had a loadable index - there is
    /// nothing searchable, as opposed to nothing matching
    #[error("No course materials available")]
    NoMaterials,

    /// Completion backend error; never substituted with a fabricated answer
    #[error("Generation error: {0}")]
    Generation(String),

    /// Completion backend returned empty or unparseable output where
    /// structured output was expected
    #[error("Malformed backend output: {0}")]
    MalformedOutput(String),

    /// Index storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for studium operations
pub type Result<T> = std::result::Result<T, StudiumError>;
