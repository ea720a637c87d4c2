//! Bounded, time-expiring cache of page segmentation results.

use crate::config::NarratorConfig;
use crate::text::TextChunk;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::collections::BTreeMap;

/// Default number of pages kept.
pub const DEFAULT_CAPACITY: usize = 20;

/// Default lifetime of a cached page, in seconds.
pub const DEFAULT_EXPIRY_SECS: u64 = 30 * 60;

/// Chunks for one page plus the time they were stored.
#[derive(Debug, Clone)]
struct CachedPage {
    chunks: Vec<TextChunk>,
    timestamp: DateTime<Utc>,
}

/// Page number -> chunks, with a size bound and lazy expiry.
///
/// The cache never segments text itself; callers check [`PageChunkCache::get`],
/// segment on a miss and write the result back with [`PageChunkCache::set`].
#[derive(Debug)]
pub struct PageChunkCache {
    entries: BTreeMap<u32, CachedPage>,
    capacity: usize,
    expiry: Duration,
}

impl Default for PageChunkCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Duration::seconds(DEFAULT_EXPIRY_SECS as i64))
    }
}

impl PageChunkCache {
    /// Create a cache holding at most `capacity` pages for `expiry` each.
    pub fn new(capacity: usize, expiry: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
            expiry,
        }
    }

    pub fn from_config(config: &NarratorConfig) -> Self {
        let expiry_secs = i64::try_from(config.cache_expiry_secs).unwrap_or(i64::MAX);
        let expiry = Duration::try_seconds(expiry_secs).unwrap_or(Duration::MAX);
        Self::new(config.cache_capacity, expiry)
    }

    /// Look up a page, evicting it if it has expired.
    pub fn get(&mut self, page_number: u32) -> Option<Vec<TextChunk>> {
        self.get_at(page_number, Utc::now())
    }

    /// [`PageChunkCache::get`] with an explicit clock.
    pub fn get_at(&mut self, page_number: u32, now: DateTime<Utc>) -> Option<Vec<TextChunk>> {
        let cached = self.entries.get(&page_number)?;

        if now - cached.timestamp > self.expiry {
            debug!("Cache entry for page {} expired", page_number);
            self.entries.remove(&page_number);
            return None;
        }

        Some(cached.chunks.clone())
    }

    /// Store the chunks for a page.
    pub fn set(&mut self, page_number: u32, chunks: Vec<TextChunk>) {
        self.set_at(page_number, chunks, Utc::now());
    }

    /// [`PageChunkCache::set`] with an explicit clock.
    ///
    /// Empty chunk lists are not stored. A new page at capacity evicts the
    /// oldest entry first; replacing an existing page evicts nothing.
    pub fn set_at(&mut self, page_number: u32, chunks: Vec<TextChunk>, now: DateTime<Utc>) {
        if chunks.is_empty() || self.capacity == 0 {
            return;
        }

        if !self.entries.contains_key(&page_number) && self.entries.len() >= self.capacity {
            if let Some(oldest) = self.find_oldest_entry() {
                debug!("Cache full, evicting page {}", oldest);
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(
            page_number,
            CachedPage {
                chunks,
                timestamp: now,
            },
        );
    }

    /// Oldest entry by timestamp; ties go to the lowest page number.
    fn find_oldest_entry(&self) -> Option<u32> {
        self.entries
            .iter()
            .min_by_key(|(page, cached)| (cached.timestamp, **page))
            .map(|(page, _)| *page)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
