//! API layer for studium
//!
//! This module provides the programmatic boundary consumed by the
//! surrounding service: cross-document retrieval, citation mapping, and the
//! high-level study assistant facade.

pub mod assistant;
pub mod citation;
pub mod retriever;

// Re-export main API types
pub use assistant::{Answer, AnswerEvent, StudyAssistant};
pub use citation::{Citation, CitationMapper};
pub use retriever::{DocumentDescriptor, RetrievedChunk, Retriever};
