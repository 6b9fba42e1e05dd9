//! Index storage for studium
//!
//! Persists one embedding index per document as a single embedded SQLite
//! file, published atomically and addressed by a handle derived from the
//! document id.

pub mod index_store;
pub mod schema;

// Re-export main types
pub use index_store::{IndexHandle, IndexStore, StoredIndex};
