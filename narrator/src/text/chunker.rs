//! Page text segmentation for narration.

use super::TextChunk;
use super::cleaner::normalize_text;

/// Default maximum chunk size in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split normalized text into sentence units.
///
/// Each unit keeps its run of terminal punctuation. Text after the last
/// terminal mark becomes a final unit.
fn split_into_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminal(c) {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !is_terminal(next) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }

        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = end;
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }

    sentences
}

/// Split raw page text into ordered, bounded chunks.
///
/// Sentences are packed greedily; the buffer is flushed before a sentence
/// that would push it past `max_chunk_size`. A single sentence longer than
/// the limit is never cut and becomes its own chunk.
///
/// # Arguments
/// * `raw_text` - Text as extracted from the page
/// * `page_number` - Page the text came from, copied into every chunk
/// * `max_chunk_size` - Soft chunk limit in characters
///
/// # Returns
/// Chunks indexed from 0. Empty when the page has no speakable text.
pub fn segment(raw_text: &str, page_number: u32, max_chunk_size: usize) -> Vec<TextChunk> {
    let Some(text) = normalize_text(raw_text) else {
        return Vec::new();
    };

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0;

    for sentence in split_into_sentences(&text) {
        let sentence_len = sentence.chars().count();

        if !buffer.is_empty() && buffer_len + 1 + sentence_len > max_chunk_size {
            push_chunk(&mut chunks, &buffer, page_number);
            buffer.clear();
            buffer_len = 0;
        }

        if !buffer.is_empty() {
            buffer.push(' ');
            buffer_len += 1;
        }
        buffer.push_str(sentence);
        buffer_len += sentence_len;
    }

    // Don't forget the last chunk
    if !buffer.trim().is_empty() {
        push_chunk(&mut chunks, &buffer, page_number);
    }

    chunks
}

/// [`segment`] with [`DEFAULT_MAX_CHUNK_SIZE`].
pub fn segment_page(raw_text: &str, page_number: u32) -> Vec<TextChunk> {
    segment(raw_text, page_number, DEFAULT_MAX_CHUNK_SIZE)
}

fn push_chunk(chunks: &mut Vec<TextChunk>, buffer: &str, page_number: u32) {
    let index = chunks.len();
    chunks.push(TextChunk::new(page_number, index, buffer.trim().to_string()));
}
