//! Pluggable completion backends
//!
//! One variant per vendor behind a uniform `generate`/`generate_stream`
//! surface. Selection is configuration: the chosen provider is constructed
//! once and passed into the core explicitly, never cached in module state.

use crate::config::LlmConfig;
use crate::error::{Result, StudiumError};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
};
use async_openai::{Client, config::OpenAIConfig};
use futures::StreamExt;
use tokio::sync::mpsc;

/// Groq exposes an OpenAI-compatible endpoint
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

const SYSTEM_PROMPT: &str = "You are a helpful educational AI tutor.";

/// Completion backend, one variant per vendor
pub enum LlmProvider {
    /// OpenAI, Groq, or any OpenAI-compatible server
    OpenAi(OpenAiProvider),
    /// Deterministic canned responses for tests and offline runs
    Scripted(ScriptedProvider),
}

impl LlmProvider {
    /// Construct the provider named by the configuration
    ///
    /// Priority: explicit `provider` value, then key-based auto-detection
    /// (`GROQ_API_KEY` first, `OPENAI_API_KEY` second).
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let name = if config.provider == "auto" {
            if std::env::var("GROQ_API_KEY").is_ok() {
                "groq".to_string()
            } else if std::env::var("OPENAI_API_KEY").is_ok() {
                "openai".to_string()
            } else {
                return Err(StudiumError::Config(
                    "No LLM API key found. Set GROQ_API_KEY or OPENAI_API_KEY.".to_string(),
                ));
            }
        } else {
            config.provider.to_lowercase()
        };

        match name.as_str() {
            "groq" => {
                let api_key = std::env::var("GROQ_API_KEY").map_err(|_| {
                    StudiumError::Config("GROQ_API_KEY environment variable not set".to_string())
                })?;
                let model = config
                    .model
                    .clone()
                    .or_else(|| std::env::var("GROQ_MODEL").ok())
                    .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string());
                let api_base = config
                    .api_base
                    .clone()
                    .unwrap_or_else(|| GROQ_API_BASE.to_string());
                Ok(Self::OpenAi(OpenAiProvider::new(
                    "groq",
                    api_key,
                    Some(api_base),
                    model,
                    config.max_tokens,
                    config.temperature,
                )))
            }
            "openai" => {
                let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                    StudiumError::Config("OPENAI_API_KEY environment variable not set".to_string())
                })?;
                let model = config
                    .model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
                Ok(Self::OpenAi(OpenAiProvider::new(
                    "openai",
                    api_key,
                    config.api_base.clone(),
                    model,
                    config.max_tokens,
                    config.temperature,
                )))
            }
            "scripted" => Ok(Self::Scripted(ScriptedProvider::new(
                "Scripted backend: configure a real provider for model answers.",
            ))),
            other => Err(StudiumError::Config(format!(
                "Unknown LLM provider: {}",
                other
            ))),
        }
    }

    /// Provider name for logging and stats
    pub fn name(&self) -> &str {
        match self {
            Self::OpenAi(p) => p.name(),
            Self::Scripted(_) => "scripted",
        }
    }

    /// Generate a complete response for `prompt`
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            Self::OpenAi(p) => p.generate(prompt).await,
            Self::Scripted(p) => p.generate(prompt),
        }
    }

    /// Generate a streaming response for `prompt`
    ///
    /// Chunks arrive in generation order over a bounded channel holding one
    /// in-flight chunk. The producer stops promptly once the receiver is
    /// dropped. A mid-stream backend error is forwarded as `Err` and the
    /// channel closes with no further chunks.
    pub async fn generate_stream(&self, prompt: &str) -> Result<mpsc::Receiver<Result<String>>> {
        match self {
            Self::OpenAi(p) => p.generate_stream(prompt).await,
            Self::Scripted(p) => p.generate_stream(),
        }
    }
}

/// Provider for OpenAI-compatible chat completion APIs
pub struct OpenAiProvider {
    name: &'static str,
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u16,
    temperature: f32,
}

impl OpenAiProvider {
    /// Create a provider with an explicit key, base URL, and model
    pub fn new(
        name: &'static str,
        api_key: String,
        api_base: Option<String>,
        model: String,
        max_tokens: u16,
        temperature: f32,
    ) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            openai_config = openai_config.with_api_base(base);
        }

        log::info!("Initialized {} provider with model {}", name, model);
        Self {
            name,
            client: Client::with_config(openai_config),
            model,
            max_tokens,
            temperature,
        }
    }

    /// Provider name
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn build_request(
        &self,
        prompt: &str,
        stream: bool,
    ) -> Result<async_openai::types::CreateChatCompletionRequest> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(SYSTEM_PROMPT.to_string()),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                name: None,
            }),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .stream(stream)
            .build()
            .map_err(|e| StudiumError::Generation(format!("Bad completion request: {}", e)))
    }

    /// Generate a complete response
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt, false)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| StudiumError::Generation(format!("Completion API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .ok_or_else(|| {
                StudiumError::Generation("No content in completion response".to_string())
            })?;

        Ok(content.clone())
    }

    /// Generate a streaming response
    pub async fn generate_stream(&self, prompt: &str) -> Result<mpsc::Receiver<Result<String>>> {
        let request = self.build_request(prompt, true)?;

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| StudiumError::Generation(format!("Completion API error: {}", e)))?;

        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(response) => {
                        for choice in response.choices {
                            if let Some(content) = choice.delta.content {
                                if content.is_empty() {
                                    continue;
                                }
                                if tx.send(Ok(content)).await.is_err() {
                                    // Consumer gone; abandon the stream
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(StudiumError::Generation(format!(
                                "Completion stream error: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

enum ScriptedMode {
    Succeed,
    FailImmediately,
    FailMidStream,
}

/// Deterministic completion backend
///
/// Returns a fixed response, streamed in fixed-size character chunks so the
/// streaming plumbing can be tested for ordering and completeness.
pub struct ScriptedProvider {
    response: String,
    chunk_chars: usize,
    mode: ScriptedMode,
}

impl ScriptedProvider {
    /// A provider that always answers with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            chunk_chars: 8,
            mode: ScriptedMode::Succeed,
        }
    }

    /// A provider whose calls fail outright
    pub fn failing() -> Self {
        Self {
            response: String::new(),
            chunk_chars: 8,
            mode: ScriptedMode::FailImmediately,
        }
    }

    /// A provider whose stream dies after the first chunk
    pub fn failing_mid_stream(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            chunk_chars: 8,
            mode: ScriptedMode::FailMidStream,
        }
    }

    /// Override the streaming chunk size (in characters)
    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// Generate the scripted response
    pub fn generate(&self, _prompt: &str) -> Result<String> {
        match self.mode {
            ScriptedMode::FailImmediately => Err(StudiumError::Generation(
                "scripted backend failure".to_string(),
            )),
            _ => Ok(self.response.clone()),
        }
    }

    /// Stream the scripted response in order
    pub fn generate_stream(&self) -> Result<mpsc::Receiver<Result<String>>> {
        if matches!(self.mode, ScriptedMode::FailImmediately) {
            return Err(StudiumError::Generation(
                "scripted backend failure".to_string(),
            ));
        }

        let chars: Vec<char> = self.response.chars().collect();
        let pieces: Vec<String> = chars
            .chunks(self.chunk_chars)
            .map(|c| c.iter().collect())
            .collect();
        let fail_mid_stream = matches!(self.mode, ScriptedMode::FailMidStream);

        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            for (i, piece) in pieces.into_iter().enumerate() {
                if fail_mid_stream && i == 1 {
                    let _ = tx
                        .send(Err(StudiumError::Generation(
                            "scripted mid-stream failure".to_string(),
                        )))
                        .await;
                    return;
                }
                if tx.send(Ok(piece)).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_stream_reassembles_to_generate_output() {
        let provider = LlmProvider::Scripted(
            ScriptedProvider::new("The Krebs cycle produces ATP [1].").with_chunk_chars(5),
        );

        let full = provider.generate("q").await.unwrap();

        let mut rx = provider.generate_stream("q").await.unwrap();
        let mut assembled = String::new();
        while let Some(piece) = rx.recv().await {
            assembled.push_str(&piece.unwrap());
        }

        assert_eq!(assembled, full);
    }

    #[tokio::test]
    async fn test_scripted_failure_is_generation_error() {
        let provider = LlmProvider::Scripted(ScriptedProvider::failing());
        assert!(matches!(
            provider.generate("q").await,
            Err(StudiumError::Generation(_))
        ));
        assert!(matches!(
            provider.generate_stream("q").await,
            Err(StudiumError::Generation(_))
        ));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_forwards_error_then_closes() {
        let provider = LlmProvider::Scripted(
            ScriptedProvider::failing_mid_stream("twelve chars!").with_chunk_chars(6),
        );

        let mut rx = provider.generate_stream("q").await.unwrap();
        assert!(rx.recv().await.unwrap().is_ok());
        assert!(rx.recv().await.unwrap().is_err());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_abandoned_stream_stops_producer() {
        let provider =
            LlmProvider::Scripted(ScriptedProvider::new("a".repeat(1000)).with_chunk_chars(1));
        let mut rx = provider.generate_stream("q").await.unwrap();
        let _ = rx.recv().await;
        drop(rx);
        // Producer task exits on the failed send; nothing hangs. Give it a
        // scheduling turn so the task observes the closed channel.
        tokio::task::yield_now().await;
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let config = LlmConfig {
            provider: "mystery".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            LlmProvider::from_config(&config),
            Err(StudiumError::Config(_))
        ));
    }

    #[test]
    fn test_scripted_provider_by_name() {
        let config = LlmConfig {
            provider: "scripted".to_string(),
            ..LlmConfig::default()
        };
        let provider = LlmProvider::from_config(&config).unwrap();
        assert_eq!(provider.name(), "scripted");
    }
}
