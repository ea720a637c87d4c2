//! Plain-text documents split into pages.
//!
//! Pages are separated by form feed (`\x0c`), which is what `pdftotext`
//! emits between pages.

use crate::extract::{PageSource, PageText};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

const PAGE_BREAK: char = '\u{000c}';

/// A loaded document with a current-page cursor.
#[derive(Debug)]
pub struct PagedDocument {
    /// Document title (file stem)
    pub title: String,
    /// Page texts in order
    pages: Vec<String>,
    /// Currently displayed page, 1-based
    current: AtomicU32,
}

impl PagedDocument {
    /// Build a document from text, splitting on form feeds.
    pub fn from_text(title: impl Into<String>, text: &str) -> Self {
        let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();

        // pdftotext terminates every page, including the last, with a form feed.
        if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
            pages.pop();
        }

        Self {
            title: title.into(),
            pages,
            current: AtomicU32::new(1),
        }
    }

    /// Load a UTF-8 text document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string());
        Ok(Self::from_text(title, &text))
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn current_page_number(&self) -> u32 {
        self.current.load(Ordering::SeqCst)
    }

    /// Text of a page, if it exists.
    pub fn page(&self, page_number: u32) -> Option<&str> {
        let index = page_number.checked_sub(1)? as usize;
        self.pages.get(index).map(String::as_str)
    }

    /// Move to a page. Returns false if it is out of range.
    pub fn go_to(&self, page_number: u32) -> bool {
        if page_number == 0 || page_number > self.page_count() {
            return false;
        }
        self.current.store(page_number, Ordering::SeqCst);
        true
    }

    pub fn next_page(&self) -> bool {
        self.go_to(self.current_page_number() + 1)
    }

    pub fn previous_page(&self) -> bool {
        match self.current_page_number().checked_sub(1) {
            Some(page) => self.go_to(page),
            None => false,
        }
    }

    /// Approximate word count across all pages.
    pub fn total_words(&self) -> usize {
        self.pages
            .iter()
            .map(|p| p.split_whitespace().count())
            .sum()
    }
}

#[async_trait]
impl PageSource for PagedDocument {
    async fn current_page(&self) -> Result<PageText> {
        let page_number = self.current_page_number();
        let text = self
            .page(page_number)
            .with_context(|| format!("Page {} is out of range", page_number))?;
        Ok(PageText::new(text, page_number))
    }
}
