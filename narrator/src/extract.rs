//! Page text supply and read-through chunk extraction.

use crate::cache::PageChunkCache;
use crate::config::NarratorConfig;
use crate::text::{DEFAULT_MAX_CHUNK_SIZE, TextChunk, segment};
use anyhow::Result;
use async_trait::async_trait;
use log::debug;

/// Raw text of the page currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub raw_text: String,
    /// 1-based page number
    pub page_number: u32,
}

impl PageText {
    pub fn new(raw_text: impl Into<String>, page_number: u32) -> Self {
        Self {
            raw_text: raw_text.into(),
            page_number,
        }
    }
}

/// Supplies the text of the currently displayed page.
///
/// The narrator runs each lookup on its own task and aborts it on cleanup,
/// so a slow supplier only delays the first chunk.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn current_page(&self) -> Result<PageText>;
}

/// Turns page text into chunks, consulting the cache first.
#[derive(Debug)]
pub struct PageExtractor {
    cache: PageChunkCache,
    max_chunk_size: usize,
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::new(PageChunkCache::default(), DEFAULT_MAX_CHUNK_SIZE)
    }
}

impl PageExtractor {
    pub fn new(cache: PageChunkCache, max_chunk_size: usize) -> Self {
        Self {
            cache,
            max_chunk_size,
        }
    }

    pub fn from_config(config: &NarratorConfig) -> Self {
        Self::new(PageChunkCache::from_config(config), config.max_chunk_size)
    }

    /// Chunks for a page: cached if fresh, otherwise segmented and cached.
    pub fn extract(&mut self, page: &PageText) -> Vec<TextChunk> {
        if let Some(chunks) = self.cache.get(page.page_number) {
            debug!("Using cached chunks for page {}", page.page_number);
            return chunks;
        }

        let chunks = segment(&page.raw_text, page.page_number, self.max_chunk_size);
        debug!(
            "Segmented page {} into {} chunk(s)",
            page.page_number,
            chunks.len()
        );
        self.cache.set(page.page_number, chunks.clone());
        chunks
    }

    pub fn cache(&self) -> &PageChunkCache {
        &self.cache
    }

    /// Drop all cached pages.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
