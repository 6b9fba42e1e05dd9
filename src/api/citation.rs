//! Citation mapping
//!
//! Deduplicates retrieved chunks by source document, assigns stable 1-based
//! citation numbers in first-seen order, and renders the citation-annotated
//! context block handed to the answer synthesizer. Citation numbers are only
//! meaningful within a single answer.

use crate::api::retriever::RetrievedChunk;
use crate::utils::truncate_chars;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Snippet previews are capped at this many characters
pub const SNIPPET_MAX_CHARS: usize = 200;

/// A numbered reference to one source document used in an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based number, assigned in first-seen order
    pub citation_number: usize,

    /// Source document id
    pub document_id: String,

    /// Source document display name
    pub display_name: String,

    /// Distinct pages contributing to this citation, ascending
    pub pages: Vec<u32>,

    /// Preview of the first retrieved chunk for this source
    pub snippet: String,
}

/// Maps ranked chunks to a context block plus source list
pub struct CitationMapper;

impl CitationMapper {
    /// Build the prompt-ready context block and the ordered citation list
    ///
    /// Chunks are processed in their given (ranked) order; every chunk from
    /// an already-seen source reuses that source's citation number and
    /// contributes its page to the citation's page set.
    pub fn map(chunks: &[RetrievedChunk]) -> (String, Vec<Citation>) {
        let mut context_block = String::new();
        let mut source_numbers: HashMap<(String, String), usize> = HashMap::new();
        let mut citations: Vec<Citation> = Vec::new();
        let mut page_sets: Vec<BTreeSet<u32>> = Vec::new();

        for chunk in chunks {
            let key = (chunk.document_id.clone(), chunk.display_name.clone());
            let number = match source_numbers.get(&key) {
                Some(&number) => number,
                None => {
                    let number = citations.len() + 1;
                    source_numbers.insert(key, number);
                    citations.push(Citation {
                        citation_number: number,
                        document_id: chunk.document_id.clone(),
                        display_name: chunk.display_name.clone(),
                        pages: Vec::new(),
                        snippet: truncate_chars(&chunk.text, SNIPPET_MAX_CHARS),
                    });
                    page_sets.push(BTreeSet::new());
                    number
                }
            };

            if let Some(page) = chunk.page {
                page_sets[number - 1].insert(page);
            }

            let page_label = chunk
                .page
                .map(|p| format!(" (Page {})", p))
                .unwrap_or_default();
            context_block.push_str(&format!(
                "Source [{}]: {}{}\n---\n{}\n---\n\n",
                number, chunk.display_name, page_label, chunk.text
            ));
        }

        for (citation, pages) in citations.iter_mut().zip(page_sets) {
            citation.pages = pages.into_iter().collect();
        }

        (context_block, citations)
    }
}
