//! Answer synthesis over a citation-annotated context block
//!
//! Wraps a completion backend with the tutor prompt: answer strictly from the
//! provided context, mark used facts with `[citation_number]`, and refuse
//! with a fixed phrase when the context does not contain the answer.

use crate::error::{Result, StudiumError};
use crate::llm::provider::LlmProvider;
use tokio::sync::mpsc;

/// The exact phrase the backend is instructed to emit when the context does
/// not contain the answer. Callers and tests match against this string, so
/// it must never drift.
pub const REFUSAL_PHRASE: &str = "I'm sorry, I can't find the answer in the provided documents.";

/// Turns a question plus context block into an answer via the configured
/// completion backend
pub struct AnswerSynthesizer {
    provider: LlmProvider,
}

impl AnswerSynthesizer {
    /// Create a synthesizer over an explicitly constructed provider
    pub fn new(provider: LlmProvider) -> Self {
        Self { provider }
    }

    /// The wrapped provider
    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Build the tutor prompt for a question and its context block
    pub fn build_prompt(question: &str, context_block: &str) -> String {
        format!(
            "You are a helpful and knowledgeable tutor. Your students will ask you questions \
             about the course materials.\n\
             Answer the user's question based *only* on the provided context.\n\
             For each piece of information you use, cite the source document using the format \
             [citation_number].\n\
             The citation number corresponds to the source provided in the context, e.g., \
             Source [1]: filename.\n\
             If the answer is not found in the context, say \"{}\"\n\n\
             Context:\n{}\n\n\
             Question:\n{}\n\n\
             Answer:",
            REFUSAL_PHRASE, context_block, question
        )
    }

    /// Generate a complete answer
    ///
    /// An empty completion is a failure, never an empty-but-successful
    /// answer.
    pub async fn generate(&self, question: &str, context_block: &str) -> Result<String> {
        let prompt = Self::build_prompt(question, context_block);
        log::debug!("Prompt length: {} characters", prompt.len());

        let answer = self.provider.generate(&prompt).await?;
        if answer.trim().is_empty() {
            return Err(StudiumError::Generation(
                "Completion backend returned an empty answer".to_string(),
            ));
        }
        Ok(answer)
    }

    /// Generate an answer as an ordered stream of text fragments
    ///
    /// Fragments must be concatenated in arrival order to reconstruct the
    /// answer. Each call re-invokes the backend; streams are not restartable.
    pub async fn generate_stream(
        &self,
        question: &str,
        context_block: &str,
    ) -> Result<mpsc::Receiver<Result<String>>> {
        let prompt = Self::build_prompt(question, context_block);
        self.provider.generate_stream(&prompt).await
    }
}
