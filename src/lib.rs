//! # studium
//!
//! The retrieval and scheduling core of an AI study assistant: chunk course
//! documents into overlapping windows, build per-document vector indices,
//! answer questions with numbered citations over one or more documents
//! (plain or streamed), and schedule flashcard reviews with SM-2.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use studium::{Config, DocumentText, LlmProvider, StudyAssistant};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let provider = LlmProvider::from_config(&config.llm)?;
//!     let assistant = StudyAssistant::new(&config, provider)?;
//!
//!     // Ingest course material; the index is published atomically
//!     assistant
//!         .ingest(&DocumentText::plain("Your course notes here."), "notes-1")
//!         .await?;
//!
//!     // Ask a question across one or more ingested documents
//!     let documents = vec![assistant.describe("notes-1", "notes.txt")];
//!     let answer = assistant.ask("What is covered here?", &documents, 5).await?;
//!
//!     println!("{}", answer.answer);
//!     for source in &answer.sources {
//!         println!("[{}] {}", source.citation_number, source.display_name);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod ml;
pub mod scheduler;
pub mod storage;
pub mod text;
pub mod utils;

// Re-export main API types
pub use api::{
    Answer, AnswerEvent, Citation, CitationMapper, DocumentDescriptor, RetrievedChunk, Retriever,
    StudyAssistant,
};
pub use config::Config;
pub use error::{Result, StudiumError};
pub use llm::{AnswerSynthesizer, LlmProvider, QuizQuestion, REFUSAL_PHRASE, ScriptedProvider};
pub use ml::{Embedder, Embedding, LexicalEmbedder};
pub use scheduler::{FlashcardSchedule, review, review_at};
pub use storage::{IndexHandle, IndexStore, StoredIndex};
pub use text::{Chunk, DocumentText, TextChunker};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_imports() {
        // Ensure all major types can be imported
        let _config = Config::default();
        let _schedule = FlashcardSchedule::default();
    }
}
