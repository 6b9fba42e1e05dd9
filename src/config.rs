//! Configuration types for studium
//!
//! Every subsystem takes its section of [`Config`] explicitly; nothing in the
//! core reads process-wide state at runtime. Environment variables are only
//! consulted when a provider is constructed from configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Text chunking settings
    pub chunking: ChunkingConfig,

    /// Embedding backend settings
    pub embedding: EmbeddingConfig,

    /// Completion backend settings
    pub llm: LlmConfig,

    /// Index storage settings
    pub storage: StorageConfig,
}

/// Configuration for the text chunker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target window size in characters
    pub chunk_size: usize,

    /// Overlap between consecutive windows in characters
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Deterministic feature-hashing embedder, fully offline
    Lexical,
    /// Remote embeddings through an OpenAI-compatible API
    OpenAi,
}

/// Configuration for embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Which backend computes the vectors
    pub backend: EmbeddingBackend,

    /// Model name for remote backends
    pub model_name: String,

    /// Vector dimensionality; must match across every index queried together
    pub dimension: usize,

    /// Whether to normalize vectors to unit length
    pub normalize: bool,

    /// Batch size for bulk encoding
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Lexical,
            model_name: "text-embedding-3-small".to_string(),
            dimension: 384,
            normalize: true,
            batch_size: 32,
        }
    }
}

/// Configuration for the completion backend
///
/// `provider` accepts `"auto"`, `"openai"`, `"groq"`, or `"scripted"`.
/// With `"auto"`, the provider is picked from whichever API key is present,
/// `GROQ_API_KEY` first. Selection happens once, at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name, or "auto" for key-based detection
    pub provider: String,

    /// Model name; `None` selects the provider default
    pub model: Option<String>,

    /// Base URL override for OpenAI-compatible servers
    pub api_base: Option<String>,

    /// Completion token budget
    pub max_tokens: u16,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "auto".to_string(),
            model: None,
            api_base: None,
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl LlmConfig {
    /// Build a config whose provider name comes from `STUDIUM_LLM_PROVIDER`,
    /// falling back to auto-detection
    pub fn from_env() -> Self {
        let provider = std::env::var("STUDIUM_LLM_PROVIDER")
            .unwrap_or_else(|_| "auto".to_string())
            .to_lowercase();
        Self {
            provider,
            ..Self::default()
        }
    }
}

/// Configuration for index storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one index file per document
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("vector_stores"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_defaults() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.overlap, 200);
        assert!(config.overlap < config.chunk_size);
    }

    #[test]
    fn test_embedding_defaults() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.backend, EmbeddingBackend::Lexical);
        assert_eq!(config.dimension, 384);
        assert!(config.normalize);
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.chunking.chunk_size, config.chunking.chunk_size);
        assert_eq!(restored.llm.provider, "auto");
    }
}
