//! Structured output from free-form completions
//!
//! Quiz generation asks the backend for JSON and extracts a parseable
//! fragment from whatever comes back (fences, prose padding). Anything empty
//! or unparseable surfaces as `MalformedOutput`; nothing is retried here.

use crate::error::{Result, StudiumError};
use crate::llm::provider::LlmProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One multiple-choice quiz question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    /// The question text
    pub question: String,

    /// Options keyed "A" through "D"
    pub options: BTreeMap<String, String>,

    /// Key of the correct option
    pub answer: String,
}

/// Generate a multiple-choice quiz from course context
pub async fn generate_quiz(
    provider: &LlmProvider,
    context: &str,
    count: usize,
) -> Result<Vec<QuizQuestion>> {
    let prompt = build_quiz_prompt(context, count);
    let raw = provider.generate(&prompt).await?;
    parse_quiz(&raw)
}

fn build_quiz_prompt(context: &str, count: usize) -> String {
    format!(
        "You are a helpful assistant designed to create educational quizzes. Based on the \
         following context from multiple documents, generate a quiz with exactly {} \
         multiple-choice questions.\n\n\
         Instructions:\n\
         1. The questions should cover key concepts from the provided text.\n\
         2. For each question, provide 4 options (A, B, C, D).\n\
         3. Clearly indicate the correct answer for each question.\n\
         4. Return the result as a single, valid JSON array. Do not include any text or \
         formatting outside of the JSON.\n\
         5. Each element must be an object with the keys \"question\", \"options\", and \
         \"answer\", where \"options\" holds an object with keys \"A\", \"B\", \"C\", \"D\".\n\n\
         **Context from course materials:**\n\
         ---\n{}\n---\n\n\
         **JSON Output:**",
        count, context
    )
}

/// Parse backend output into quiz questions
pub fn parse_quiz(raw: &str) -> Result<Vec<QuizQuestion>> {
    let fragment = extract_json_fragment(raw)?;
    let questions: Vec<QuizQuestion> = serde_json::from_str(&fragment)
        .map_err(|e| StudiumError::MalformedOutput(format!("Quiz JSON did not parse: {}", e)))?;
    if questions.is_empty() {
        return Err(StudiumError::MalformedOutput(
            "Quiz JSON contained no questions".to_string(),
        ));
    }
    Ok(questions)
}

/// Best-effort extraction of a JSON value from free-form model output
///
/// Strips Markdown code fences and slices from the first opening bracket to
/// the last matching closing bracket.
pub fn extract_json_fragment(raw: &str) -> Result<String> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(StudiumError::MalformedOutput(
            "Backend returned empty output".to_string(),
        ));
    }

    let start = cleaned.find(['[', '{']).ok_or_else(|| {
        StudiumError::MalformedOutput("No JSON found in backend output".to_string())
    })?;
    let closer = if cleaned.as_bytes()[start] == b'[' {
        ']'
    } else {
        '}'
    };
    let end = cleaned.rfind(closer).ok_or_else(|| {
        StudiumError::MalformedOutput("Unterminated JSON in backend output".to_string())
    })?;
    if end < start {
        return Err(StudiumError::MalformedOutput(
            "Unterminated JSON in backend output".to_string(),
        ));
    }

    Ok(cleaned[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::ScriptedProvider;

    const QUIZ_JSON: &str = r#"[
        {
            "question": "What does the mitochondria produce?",
            "options": {"A": "ATP", "B": "DNA", "C": "Cellulose", "D": "Starch"},
            "answer": "A"
        }
    ]"#;

    #[test]
    fn test_extract_plain_json() {
        let fragment = extract_json_fragment(QUIZ_JSON).unwrap();
        assert!(fragment.starts_with('['));
        assert!(fragment.ends_with(']'));
    }

    #[test]
    fn test_extract_fenced_json_with_prose() {
        let raw = format!("Here is your quiz:\n```json\n{}\n```\nEnjoy!", QUIZ_JSON);
        let questions = parse_quiz(&raw).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].answer, "A");
        assert_eq!(questions[0].options["A"], "ATP");
    }

    #[test]
    fn test_empty_output_is_malformed() {
        assert!(matches!(
            parse_quiz("   \n"),
            Err(StudiumError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_garbage_output_is_malformed() {
        assert!(matches!(
            parse_quiz("I am unable to produce a quiz right now."),
            Err(StudiumError::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_quiz("[{\"question\": \"truncated\""),
            Err(StudiumError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_empty_array_is_malformed() {
        assert!(matches!(
            parse_quiz("[]"),
            Err(StudiumError::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_quiz_with_scripted_backend() {
        let provider = LlmProvider::Scripted(ScriptedProvider::new(format!(
            "```json\n{}\n```",
            QUIZ_JSON
        )));
        let questions = generate_quiz(&provider, "The mitochondria produces ATP.", 1)
            .await
            .unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(
            questions[0].question,
            "What does the mitochondria produce?"
        );
    }
}
