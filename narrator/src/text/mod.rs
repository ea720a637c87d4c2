//! Text processing for narration: cleaning, sentence splitting, and chunking.

pub mod chunker;
mod cleaner;

pub use chunker::{DEFAULT_MAX_CHUNK_SIZE, segment, segment_page};
pub use cleaner::normalize_text;

use serde::Serialize;

/// A bounded piece of page text ready for synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// Trimmed, non-empty text content
    pub text: String,
    /// Position of this chunk within its page, starting at 0
    pub index: usize,
    /// The page this chunk was cut from (1-based)
    pub page_number: u32,
}

impl TextChunk {
    /// Create a new text chunk.
    pub fn new(page_number: u32, index: usize, text: String) -> Self {
        Self {
            text,
            index,
            page_number,
        }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
