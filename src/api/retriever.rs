//! Cross-document nearest-neighbor retrieval
//!
//! Pools every loadable index named by the caller into one candidate set and
//! ranks it globally by cosine similarity. Documents whose index cannot be
//! loaded degrade to a warning; only when nothing at all is searchable does
//! retrieval fail, with a signal distinct from "nothing matched".

use crate::error::{Result, StudiumError};
use crate::ml::{Embedder, cosine_similarity};
use crate::storage::{IndexHandle, IndexStore};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// What the surrounding service knows about a queryable document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Document id
    pub id: String,

    /// Human-readable name shown in citations
    pub display_name: String,

    /// Handle to the document's persisted index
    pub index_handle: IndexHandle,
}

/// One ranked retrieval candidate; ephemeral, never persisted
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// Owning document's id
    pub document_id: String,

    /// Owning document's display name
    pub display_name: String,

    /// Chunk text
    pub text: String,

    /// 1-based page number, if the source was paginated
    pub page: Option<u32>,

    /// Cosine similarity against the query
    pub similarity: f32,

    /// Chunk position within its document, for deterministic tie-breaking
    pub sequence_index: usize,
}

/// Retriever over a store and the embedding backend used at ingestion
pub struct Retriever<'a> {
    store: &'a IndexStore,
    embedder: &'a Embedder,
}

impl<'a> Retriever<'a> {
    /// Create a retriever borrowing its collaborators
    pub fn new(store: &'a IndexStore, embedder: &'a Embedder) -> Self {
        Self { store, embedder }
    }

    /// Return the `k` most similar chunks across all given documents
    ///
    /// Ranking is global over the pooled candidates, in non-increasing
    /// similarity order with ties broken by ascending `sequence_index`.
    /// Requesting more than the pool holds returns the whole pool. If no
    /// document's index loads, returns `NoMaterials`.
    pub async fn retrieve(
        &self,
        query: &str,
        documents: &[DocumentDescriptor],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let query_embedding = self.embedder.embed(query).await?;

        let mut candidates: Vec<RetrievedChunk> = Vec::new();
        let mut loaded_documents = 0;

        for descriptor in documents {
            let index = match self.store.load(&descriptor.index_handle) {
                Ok(index) => index,
                Err(e) => {
                    log::warn!("Skipping document '{}': {}", descriptor.id, e);
                    continue;
                }
            };
            if index.dimension != query_embedding.len() {
                log::warn!(
                    "Skipping document '{}': index dimension {} does not match query dimension {}",
                    descriptor.id,
                    index.dimension,
                    query_embedding.len()
                );
                continue;
            }

            loaded_documents += 1;
            for (vector, chunk) in index.vectors.iter().zip(index.chunks.iter()) {
                candidates.push(RetrievedChunk {
                    document_id: descriptor.id.clone(),
                    display_name: descriptor.display_name.clone(),
                    text: chunk.text.clone(),
                    page: chunk.page,
                    similarity: cosine_similarity(&query_embedding, vector),
                    sequence_index: chunk.sequence_index,
                });
            }
        }

        if loaded_documents == 0 {
            return Err(StudiumError::NoMaterials);
        }

        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.sequence_index.cmp(&b.sequence_index))
        });
        candidates.truncate(k);

        log::info!(
            "Retrieved {} chunks from {} of {} documents",
            candidates.len(),
            loaded_documents,
            documents.len()
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::ml::LexicalEmbedder;
    use crate::text::Chunk;
    use tempfile::TempDir;

    fn embedder() -> Embedder {
        Embedder::Lexical(LexicalEmbedder::new(&EmbeddingConfig::default()))
    }

    async fn index_document(
        store: &IndexStore,
        embedder: &Embedder,
        id: &str,
        texts: &[&str],
    ) -> DocumentDescriptor {
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                text: text.to_string(),
                sequence_index: i,
                page: None,
            })
            .collect();
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        let index_handle = store.publish(id, &vectors, &chunks).unwrap();
        DocumentDescriptor {
            id: id.to_string(),
            display_name: format!("{}.txt", id),
            index_handle,
        }
    }

    #[tokio::test]
    async fn test_ranks_across_documents_and_caps_at_k() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path()).unwrap();
        let embedder = embedder();

        let bio = index_document(
            &store,
            &embedder,
            "bio",
            &[
                "The mitochondria produces ATP through cellular respiration",
                "Photosynthesis happens in the chloroplast",
            ],
        )
        .await;
        let history = index_document(
            &store,
            &embedder,
            "history",
            &["The treaty of Westphalia ended the thirty years war"],
        )
        .await;

        let retriever = Retriever::new(&store, &embedder);
        let results = retriever
            .retrieve("mitochondria ATP respiration", &[bio, history], 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].similarity >= results[1].similarity);
        assert_eq!(results[0].document_id, "bio");
        assert!(results[0].text.contains("mitochondria"));
    }

    #[tokio::test]
    async fn test_k_larger_than_pool_returns_whole_pool() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path()).unwrap();
        let embedder = embedder();

        let doc = index_document(&store, &embedder, "doc", &["alpha", "beta"]).await;

        let retriever = Retriever::new(&store, &embedder);
        let results = retriever.retrieve("alpha", &[doc], 50).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_ties_break_by_sequence_index() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path()).unwrap();
        let embedder = embedder();

        // Identical text gives identical vectors, hence exact score ties
        let doc = index_document(
            &store,
            &embedder,
            "doc",
            &["repeated passage", "repeated passage", "repeated passage"],
        )
        .await;

        let retriever = Retriever::new(&store, &embedder);
        let results = retriever
            .retrieve("repeated passage", &[doc], 3)
            .await
            .unwrap();

        let order: Vec<usize> = results.iter().map(|r| r.sequence_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_missing_document_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path()).unwrap();
        let embedder = embedder();

        let good = index_document(&store, &embedder, "good", &["searchable text"]).await;
        let missing = DocumentDescriptor {
            id: "missing".to_string(),
            display_name: "missing.txt".to_string(),
            index_handle: store.handle_for("missing"),
        };

        let retriever = Retriever::new(&store, &embedder);
        let results = retriever
            .retrieve("searchable", &[missing, good], 5)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "good");
    }

    #[tokio::test]
    async fn test_all_documents_missing_is_no_materials() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path()).unwrap();
        let embedder = embedder();

        let missing = DocumentDescriptor {
            id: "missing".to_string(),
            display_name: "missing.txt".to_string(),
            index_handle: store.handle_for("missing"),
        };

        let retriever = Retriever::new(&store, &embedder);
        let result = retriever.retrieve("anything", &[missing], 5).await;
        assert!(matches!(result, Err(StudiumError::NoMaterials)));

        // An empty descriptor list has nothing searchable either
        let result = retriever.retrieve("anything", &[], 5).await;
        assert!(matches!(result, Err(StudiumError::NoMaterials)));
    }
}
