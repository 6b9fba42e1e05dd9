//! Text chunking with positional metadata
//!
//! Documents are split into overlapping windows of a fixed target size,
//! breaking preferentially at paragraph and sentence boundaries. Paginated
//! sources are chunked page by page so a window never silently merges text
//! from two pages.

use crate::config::ChunkingConfig;
use crate::error::{Result, StudiumError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// A bounded window of source text with positional metadata
///
/// Immutable once created. `sequence_index` is monotonic across the whole
/// document and is used for deterministic tie-breaking and snippet ordering,
/// never for retrieval ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The window's text content
    pub text: String,

    /// Position of this chunk within its source document
    pub sequence_index: usize,

    /// 1-based page number for paginated sources, `None` otherwise
    pub page: Option<u32>,
}

/// Raw document text as handed over by the ingestion boundary
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentText {
    /// Continuous text (web page, transcript)
    Plain(String),

    /// Page-delimited text (PDF extraction), one entry per page
    Paginated(Vec<String>),
}

impl DocumentText {
    /// Continuous text from anything stringy
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    /// Page-delimited text; pages are numbered 1-based in order
    pub fn paginated(pages: Vec<String>) -> Self {
        Self::Paginated(pages)
    }
}

/// Text chunker producing overlapping windows
pub struct TextChunker {
    config: ChunkingConfig,
    sentence_regex: Regex,
    blank_lines_regex: Regex,
}

impl TextChunker {
    /// Create a new text chunker with the given configuration
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(StudiumError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if config.overlap >= config.chunk_size {
            return Err(StudiumError::Config(format!(
                "overlap {} must be smaller than chunk_size {}",
                config.overlap, config.chunk_size
            )));
        }

        let sentence_regex = Regex::new(r"[.!?]+\s").map_err(|e| {
            StudiumError::TextProcessing(format!("Failed to compile sentence regex: {}", e))
        })?;
        let blank_lines_regex = Regex::new(r"\n{3,}").map_err(|e| {
            StudiumError::TextProcessing(format!("Failed to compile blank-lines regex: {}", e))
        })?;

        Ok(Self {
            config,
            sentence_regex,
            blank_lines_regex,
        })
    }

    /// Create a chunker with default configuration
    pub fn with_default_config() -> Result<Self> {
        Self::new(ChunkingConfig::default())
    }

    /// Split a document into ordered, overlapping chunks
    ///
    /// Empty or whitespace-only input yields an empty sequence. The output is
    /// fully determined by the input: re-chunking identical text gives
    /// identical chunks.
    pub fn chunk(&self, document: &DocumentText) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut sequence_index = 0;

        match document {
            DocumentText::Plain(text) => {
                self.chunk_segment(text, None, &mut sequence_index, &mut chunks);
            }
            DocumentText::Paginated(pages) => {
                for (page_idx, page_text) in pages.iter().enumerate() {
                    self.chunk_segment(
                        page_text,
                        Some(page_idx as u32 + 1),
                        &mut sequence_index,
                        &mut chunks,
                    );
                }
            }
        }

        chunks
    }

    /// Normalize a segment before windowing: NFC, uniform newlines, and at
    /// most one blank line between paragraphs
    fn preprocess(&self, text: &str) -> String {
        let normalized: String = text.nfc().collect();
        let normalized = normalized.replace("\r\n", "\n").replace('\r', "\n");
        self.blank_lines_regex
            .replace_all(&normalized, "\n\n")
            .into_owned()
    }

    /// Chunk one contiguous segment (a whole plain document, or one page)
    fn chunk_segment(
        &self,
        raw: &str,
        page: Option<u32>,
        sequence_index: &mut usize,
        out: &mut Vec<Chunk>,
    ) {
        let text = self.preprocess(raw);
        if text.trim().is_empty() {
            return;
        }

        if text.len() <= self.config.chunk_size {
            out.push(Chunk {
                text,
                sequence_index: *sequence_index,
                page,
            });
            *sequence_index += 1;
            return;
        }

        let mut start = 0;
        loop {
            let mut end = if start + self.config.chunk_size >= text.len() {
                text.len()
            } else {
                self.find_break(&text, start)
            };
            if end <= start {
                end = ceil_char_boundary(&text, start + 1);
            }

            out.push(Chunk {
                text: text[start..end].to_string(),
                sequence_index: *sequence_index,
                page,
            });
            *sequence_index += 1;

            if end == text.len() {
                break;
            }

            let mut next = floor_char_boundary(&text, end.saturating_sub(self.config.overlap));
            if next <= start {
                // Overlap would swallow all forward progress; drop it
                next = end;
            }
            start = next;
        }
    }

    /// Pick the end of the window starting at `start`
    ///
    /// Prefers the last paragraph break in the window, then the last sentence
    /// boundary, as long as it lands in the back half; otherwise cuts hard at
    /// the window edge.
    fn find_break(&self, text: &str, start: usize) -> usize {
        let hard_end = floor_char_boundary(text, start + self.config.chunk_size);
        let window = &text[start..hard_end];
        let min_break = self.config.chunk_size / 2;

        if let Some(pos) = window.rfind("\n\n") {
            // Separator stays with the left chunk so no text is dropped
            if pos >= min_break {
                return start + pos + 2;
            }
        }

        let mut sentence_end = None;
        for m in self.sentence_regex.find_iter(window) {
            if m.end() >= min_break {
                sentence_end = Some(m.end());
            }
        }
        if let Some(end) = sentence_end {
            return start + end;
        }

        hard_end
    }
}

/// Largest char boundary not greater than `index`
fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut index = index;
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Smallest char boundary not smaller than `index`
fn ceil_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut index = index;
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
