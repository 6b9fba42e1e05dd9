//! StudyAssistant - the high-level facade
//!
//! Ties the chunker, embedding backend, index store, and answer synthesizer
//! together behind the calls the surrounding service makes: ingest a
//! document, answer a question (plain or streaming), search, build a quiz,
//! and forget a document. Every collaborator is constructed explicitly and
//! owned here; there is no process-wide state.

use crate::api::citation::{Citation, CitationMapper};
use crate::api::retriever::{DocumentDescriptor, RetrievedChunk, Retriever};
use crate::config::Config;
use crate::error::{Result, StudiumError};
use crate::llm::provider::LlmProvider;
use crate::llm::structured::{QuizQuestion, generate_quiz};
use crate::llm::synthesizer::AnswerSynthesizer;
use crate::ml::Embedder;
use crate::storage::{IndexHandle, IndexStore};
use crate::text::{DocumentText, TextChunker};
use tokio::sync::mpsc;

/// Default number of chunks retrieved for chat answers
pub const CHAT_TOP_K: usize = 5;

/// Default number of chunks returned for search
pub const SEARCH_TOP_K: usize = 10;

/// Leading chunks sampled per document when building quiz context
const QUIZ_CHUNKS_PER_DOCUMENT: usize = 5;

/// A complete answer with its source list
#[derive(Debug, Clone)]
pub struct Answer {
    /// Answer text with `[n]` citation markers
    pub answer: String,

    /// Citations in first-seen order
    pub sources: Vec<Citation>,
}

/// One event in a streamed answer
///
/// `Delta` fragments arrive in generation order; a successful stream is
/// terminated by exactly one `Sources` event. A stream that closes without
/// `Sources` did not complete.
#[derive(Debug, Clone)]
pub enum AnswerEvent {
    /// Next fragment of answer text
    Delta(String),

    /// Terminal source list
    Sources(Vec<Citation>),
}

/// High-level study assistant over one index store
pub struct StudyAssistant {
    chunker: TextChunker,
    embedder: Embedder,
    store: IndexStore,
    synthesizer: AnswerSynthesizer,
}

impl StudyAssistant {
    /// Build an assistant from configuration plus an explicitly constructed
    /// completion provider
    pub fn new(config: &Config, provider: LlmProvider) -> Result<Self> {
        let chunker = TextChunker::new(config.chunking.clone())?;
        let embedder = Embedder::from_config(&config.embedding)?;
        let store = IndexStore::new(&config.storage.root)?;
        Ok(Self::with_components(chunker, embedder, store, provider))
    }

    /// Assemble an assistant from pre-built components
    pub fn with_components(
        chunker: TextChunker,
        embedder: Embedder,
        store: IndexStore,
        provider: LlmProvider,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            synthesizer: AnswerSynthesizer::new(provider),
        }
    }

    /// The underlying index store
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Build the descriptor for a document managed by this assistant's store
    pub fn describe(&self, document_id: &str, display_name: &str) -> DocumentDescriptor {
        DocumentDescriptor {
            id: document_id.to_string(),
            display_name: display_name.to_string(),
            index_handle: self.store.handle_for(document_id),
        }
    }

    /// Chunk, embed, and atomically publish a document's index
    ///
    /// A document with no usable text fails with an embedding error and
    /// publishes nothing; the document stays unprocessed.
    pub async fn ingest(&self, document: &DocumentText, document_id: &str) -> Result<IndexHandle> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            return Err(StudiumError::Embedding(format!(
                "Document '{}' contained no text to index",
                document_id
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        log::info!(
            "Ingested document '{}': {} chunks",
            document_id,
            chunks.len()
        );
        self.store.publish(document_id, &vectors, &chunks)
    }

    /// Answer a question from the given documents
    pub async fn ask(
        &self,
        question: &str,
        documents: &[DocumentDescriptor],
        k: usize,
    ) -> Result<Answer> {
        let retriever = Retriever::new(&self.store, &self.embedder);
        let retrieved = retriever.retrieve(question, documents, k).await?;

        let (context_block, sources) = CitationMapper::map(&retrieved);
        let answer = self.synthesizer.generate(question, &context_block).await?;

        Ok(Answer { answer, sources })
    }

    /// Answer a question as a stream of events
    ///
    /// Text deltas are forwarded in arrival order; after the backend stream
    /// completes cleanly, one terminal [`AnswerEvent::Sources`] follows. On a
    /// mid-stream backend error the error is forwarded and the stream closes
    /// without a terminal event.
    pub async fn ask_stream(
        &self,
        question: &str,
        documents: &[DocumentDescriptor],
        k: usize,
    ) -> Result<mpsc::Receiver<Result<AnswerEvent>>> {
        let retriever = Retriever::new(&self.store, &self.embedder);
        let retrieved = retriever.retrieve(question, documents, k).await?;

        let (context_block, sources) = CitationMapper::map(&retrieved);
        let mut deltas = self
            .synthesizer
            .generate_stream(question, &context_block)
            .await?;

        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            while let Some(item) = deltas.recv().await {
                match item {
                    Ok(delta) => {
                        if tx.send(Ok(AnswerEvent::Delta(delta))).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
            let _ = tx.send(Ok(AnswerEvent::Sources(sources))).await;
        });
        Ok(rx)
    }

    /// Raw ranked search across the given documents
    pub async fn search(
        &self,
        query: &str,
        documents: &[DocumentDescriptor],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let retriever = Retriever::new(&self.store, &self.embedder);
        retriever.retrieve(query, documents, k).await
    }

    /// Generate a multiple-choice quiz from the given documents
    ///
    /// Context is sampled from each document's leading chunks rather than
    /// retrieved, so the quiz covers the material broadly.
    pub async fn quiz(
        &self,
        documents: &[DocumentDescriptor],
        count: usize,
    ) -> Result<Vec<QuizQuestion>> {
        let mut context = String::new();
        let mut available = 0;

        for descriptor in documents {
            let index = match self.store.load(&descriptor.index_handle) {
                Ok(index) => index,
                Err(e) => {
                    log::warn!("Skipping document '{}': {}", descriptor.id, e);
                    continue;
                }
            };
            available += 1;

            let sample: Vec<&str> = index
                .chunks
                .iter()
                .take(QUIZ_CHUNKS_PER_DOCUMENT)
                .map(|c| c.text.as_str())
                .collect();
            context.push_str(&format!(
                "Source: {}\n---\n{}\n---\n\n",
                descriptor.display_name,
                sample.join("\n")
            ));
        }

        if available == 0 {
            return Err(StudiumError::NoMaterials);
        }

        generate_quiz(self.synthesizer.provider(), &context, count).await
    }

    /// Remove a document's index; safe to call for documents that were never
    /// ingested
    pub fn forget(&self, handle: &IndexHandle) -> Result<()> {
        self.store.delete(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::ScriptedProvider;
    use tempfile::TempDir;

    fn assistant(dir: &TempDir, provider: ScriptedProvider) -> StudyAssistant {
        let mut config = Config::default();
        config.storage.root = dir.path().to_path_buf();
        StudyAssistant::new(&config, LlmProvider::Scripted(provider)).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_then_ask_produces_cited_answer() {
        let dir = TempDir::new().unwrap();
        let assistant = assistant(
            &dir,
            ScriptedProvider::new("The mitochondria produces ATP [1]."),
        );

        assistant
            .ingest(
                &DocumentText::plain("The mitochondria produces ATP through respiration."),
                "bio-notes",
            )
            .await
            .unwrap();

        let documents = vec![assistant.describe("bio-notes", "bio-notes.txt")];
        let answer = assistant
            .ask("What produces ATP?", &documents, CHAT_TOP_K)
            .await
            .unwrap();

        assert_eq!(answer.answer, "The mitochondria produces ATP [1].");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].citation_number, 1);
        assert_eq!(answer.sources[0].display_name, "bio-notes.txt");
    }

    #[tokio::test]
    async fn test_ingest_empty_document_fails_and_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let assistant = assistant(&dir, ScriptedProvider::new("unused"));

        let result = assistant
            .ingest(&DocumentText::plain("   \n  "), "empty-doc")
            .await;
        assert!(matches!(result, Err(StudiumError::Embedding(_))));

        // Nothing was published; the document reads as unprocessed
        let handle = assistant.store().handle_for("empty-doc");
        assert!(matches!(
            assistant.store().load(&handle),
            Err(StudiumError::IndexNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ask_with_no_searchable_documents_is_degraded() {
        let dir = TempDir::new().unwrap();
        let assistant = assistant(&dir, ScriptedProvider::new("unused"));

        let documents = vec![assistant.describe("ghost", "ghost.txt")];
        let result = assistant.ask("anything?", &documents, CHAT_TOP_K).await;
        assert!(matches!(result, Err(StudiumError::NoMaterials)));
    }

    #[tokio::test]
    async fn test_forget_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let assistant = assistant(&dir, ScriptedProvider::new("unused"));

        let handle = assistant
            .ingest(&DocumentText::plain("Some course content."), "doc")
            .await
            .unwrap();

        assistant.forget(&handle).unwrap();
        assistant.forget(&handle).unwrap();
        assert!(matches!(
            assistant.store().load(&handle),
            Err(StudiumError::IndexNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_ends_with_sources() {
        let dir = TempDir::new().unwrap();
        let assistant = assistant(
            &dir,
            ScriptedProvider::new("Streaming answer [1].").with_chunk_chars(4),
        );

        assistant
            .ingest(&DocumentText::plain("Streamable course content."), "doc")
            .await
            .unwrap();

        let documents = vec![assistant.describe("doc", "doc.txt")];
        let mut rx = assistant
            .ask_stream("question?", &documents, CHAT_TOP_K)
            .await
            .unwrap();

        let mut text = String::new();
        let mut sources = None;
        while let Some(event) = rx.recv().await {
            match event.unwrap() {
                AnswerEvent::Delta(delta) => {
                    assert!(sources.is_none(), "sources must come after the last delta");
                    text.push_str(&delta);
                }
                AnswerEvent::Sources(s) => sources = Some(s),
            }
        }

        assert_eq!(text, "Streaming answer [1].");
        let sources = sources.expect("stream must end with a sources event");
        assert_eq!(sources.len(), 1);
    }
}
