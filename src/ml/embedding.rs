//! Embedding generation
//!
//! One fixed-length vector per chunk, from one of two backends: a
//! deterministic feature-hashing embedder that runs fully offline, or an
//! OpenAI-compatible embeddings API. A single retrieval must use one backend
//! consistently - vectors from different backends are not comparable.

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{Result, StudiumError};
use async_openai::{Client, config::OpenAIConfig, types::CreateEmbeddingRequestArgs};
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use unicode_normalization::UnicodeNormalization;

/// Embedding vector type
pub type Embedding = Vec<f32>;

/// Embedding backend, one variant per implementation
pub enum Embedder {
    /// Deterministic feature hashing, no network
    Lexical(LexicalEmbedder),
    /// Remote embeddings through an OpenAI-compatible API
    OpenAi(OpenAiEmbedder),
}

impl Embedder {
    /// Construct the backend named by the configuration
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        match config.backend {
            EmbeddingBackend::Lexical => Ok(Self::Lexical(LexicalEmbedder::new(config))),
            EmbeddingBackend::OpenAi => Ok(Self::OpenAi(OpenAiEmbedder::new(config)?)),
        }
    }

    /// Vector dimensionality produced by this backend
    pub fn dimension(&self) -> usize {
        match self {
            Self::Lexical(e) => e.dimension(),
            Self::OpenAi(e) => e.dimension(),
        }
    }

    /// Embed a batch of texts, preserving order
    ///
    /// An empty batch is an error: there is nothing to index and publishing
    /// an empty index would make the document look processed when it is not.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Err(StudiumError::Embedding(
                "no text chunks to embed".to_string(),
            ));
        }
        match self {
            Self::Lexical(e) => Ok(e.encode_batch(texts)),
            Self::OpenAi(e) => e.encode_batch(texts).await,
        }
    }

    /// Embed a single text (queries)
    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        Ok(batch.remove(0))
    }
}

/// Deterministic feature-hashing embedder
///
/// Tokens and token bigrams are hashed into a fixed number of signed buckets,
/// then length-normalized. Not a learned vector space, but stable across
/// runs, which makes persisted indices reproducible and tests exact.
pub struct LexicalEmbedder {
    dimension: usize,
    normalize: bool,
}

/// Hash probes per unigram token
const UNIGRAM_PROBES: u64 = 3;
/// Hash probes per bigram; weighted lower than unigrams
const BIGRAM_PROBES: u64 = 2;
const BIGRAM_WEIGHT: f32 = 0.5;

impl LexicalEmbedder {
    /// Create an embedder with the configured dimension
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            dimension: config.dimension,
            normalize: config.normalize,
        }
    }

    /// Get embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Generate embedding for a single text
    pub fn encode(&self, text: &str) -> Embedding {
        let mut embedding = vec![0.0f32; self.dimension];

        let normalized: String = text.nfc().collect::<String>().to_lowercase();
        let tokens: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return embedding;
        }

        for token in &tokens {
            for probe in 0..UNIGRAM_PROBES {
                self.bump(&mut embedding, token, probe, 1.0);
            }
        }

        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            for probe in 0..BIGRAM_PROBES {
                self.bump(&mut embedding, &bigram, UNIGRAM_PROBES + probe, BIGRAM_WEIGHT);
            }
        }

        // Sequence length normalization keeps long chunks from dominating
        let seq_norm = 1.0 / (tokens.len() as f32).sqrt();
        for value in &mut embedding {
            *value *= seq_norm;
        }

        if self.normalize {
            normalize_embedding(&mut embedding);
        }
        embedding
    }

    /// Generate embeddings for multiple texts in parallel, preserving order
    pub fn encode_batch(&self, texts: &[String]) -> Vec<Embedding> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Add one signed hash bucket contribution for `feature`
    fn bump(&self, embedding: &mut [f32], feature: &str, probe: u64, weight: f32) {
        let mut hasher = DefaultHasher::new();
        probe.hash(&mut hasher);
        feature.hash(&mut hasher);
        let hash = hasher.finish();

        let index = (hash as usize) % self.dimension;
        let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
        embedding[index] += sign * weight;
    }
}

/// Remote embedder for OpenAI-compatible APIs
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    /// Create a client from configuration; the API key comes from
    /// `OPENAI_API_KEY`
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            StudiumError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));

        Ok(Self {
            client,
            model: config.model_name.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Get embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Generate embeddings for multiple texts, preserving order
    pub async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(batch.to_vec())
                .build()
                .map_err(|e| StudiumError::Embedding(format!("Bad embedding request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| StudiumError::Embedding(format!("Embedding API error: {}", e)))?;

            for data in response.data {
                if data.embedding.len() != self.dimension {
                    return Err(StudiumError::Embedding(format!(
                        "Backend returned dimension {} but {} was configured",
                        data.embedding.len(),
                        self.dimension
                    )));
                }
                embeddings.push(data.embedding);
            }
        }

        if embeddings.len() != texts.len() {
            return Err(StudiumError::Embedding(format!(
                "Backend returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }

        Ok(embeddings)
    }
}

/// Normalize embedding to unit length
fn normalize_embedding(embedding: &mut [f32]) {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for value in embedding {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::similarity::cosine_similarity;
    use approx::assert_relative_eq;

    fn lexical() -> LexicalEmbedder {
        LexicalEmbedder::new(&EmbeddingConfig::default())
    }

    #[test]
    fn test_dimension_and_unit_norm() {
        let embedder = lexical();
        let embedding = embedder.encode("The mitochondria is the powerhouse of the cell");

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_deterministic() {
        let embedder = lexical();
        let a = embedder.encode("photosynthesis converts light into chemical energy");
        let b = embedder.encode("photosynthesis converts light into chemical energy");
        assert_eq!(a, b);
    }

    #[test]
    fn test_related_text_scores_above_unrelated() {
        let embedder = lexical();
        let doc = embedder.encode("Cell biology: the mitochondria produces ATP energy");
        let related = embedder.encode("mitochondria energy ATP");
        let unrelated = embedder.encode("medieval castle siege warfare trebuchet");

        let query_related = cosine_similarity(&related, &doc);
        let query_unrelated = cosine_similarity(&unrelated, &doc);
        assert!(query_related > query_unrelated);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = lexical();
        let embedding = embedder.encode("   \n  ");
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_batch_preserves_order() {
        let embedder = lexical();
        let texts = vec![
            "first chunk".to_string(),
            "second chunk".to_string(),
            "third chunk".to_string(),
        ];
        let batch = embedder.encode_batch(&texts);
        assert_eq!(batch.len(), 3);
        for (text, embedding) in texts.iter().zip(&batch) {
            assert_eq!(&embedder.encode(text), embedding);
        }
    }

    #[tokio::test]
    async fn test_embedder_rejects_empty_batch() {
        let embedder = Embedder::Lexical(lexical());
        let result = embedder.embed_batch(&[]).await;
        assert!(matches!(result, Err(StudiumError::Embedding(_))));
    }
}
