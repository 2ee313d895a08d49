// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! PDF text extraction with a fallback chain
//!
//! The text layer extracted by `pdf-extract` is tried first. When it errors,
//! panics or produces only whitespace, `lopdf` walks the document page by
//! page instead. Both read page by page and stop once the budget is full.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, info, warn};

use super::TextBudget;
use crate::{Result, RetitleError};

/// A single way of pulling text out of PDF bytes
pub trait PdfTextSource: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> &'static str;

    /// Extract at most `max_chars` characters; `Ok(None)` means no text
    fn extract(&self, bytes: &[u8], max_chars: usize) -> Result<Option<String>>;
}

/// Text layer via `pdf-extract`, read one page at a time so that reading
/// stops as soon as the budget is full
pub struct TextLayer;

impl TextLayer {
    fn page_text(doc: &lopdf::Document, page_number: u32) -> Result<String> {
        let mut text = String::new();
        {
            let mut output = pdf_extract::PlainTextOutput::new(&mut text);
            pdf_extract::output_doc_page(doc, &mut output, page_number)
                .map_err(|e| RetitleError::Pdf(format!("Page {}: {}", page_number, e)))?;
        }
        Ok(text)
    }
}

impl PdfTextSource for TextLayer {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, bytes: &[u8], max_chars: usize) -> Result<Option<String>> {
        let mut doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| RetitleError::Pdf(format!("Failed to load PDF: {}", e)))?;
        if doc.is_encrypted() {
            doc.decrypt("")
                .map_err(|e| RetitleError::Pdf(format!("Encrypted PDF: {}", e)))?;
        }

        let mut budget = TextBudget::new(max_chars);
        'pages: for page_number in doc.get_pages().into_keys() {
            let text = Self::page_text(&doc, page_number)?;
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if !budget.push_line(line) {
                    break 'pages;
                }
            }
        }
        Ok(budget.finish())
    }
}

/// Page-by-page extraction via `lopdf`, bounded to the first `max_pages`
pub struct PageWalker {
    pub max_pages: usize,
}

impl PdfTextSource for PageWalker {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract(&self, bytes: &[u8], max_chars: usize) -> Result<Option<String>> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| RetitleError::Pdf(format!("Failed to load PDF: {}", e)))?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            debug!("PDF has no pages");
            return Ok(None);
        }

        let mut budget = TextBudget::new(max_chars);
        for page_number in pages.keys().take(self.max_pages) {
            match doc.extract_text(&[*page_number]) {
                Ok(text) if !text.trim().is_empty() => {
                    if !budget.push_line(&text) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("lopdf could not read page {}: {}", page_number, e),
            }
        }
        Ok(budget.finish())
    }
}

/// Ordered chain of PDF text sources
pub struct PdfExtractor {
    max_chars: usize,
    sources: Vec<Box<dyn PdfTextSource>>,
}

impl PdfExtractor {
    pub fn new(max_chars: usize, fallback_pages: usize) -> Self {
        Self::with_sources(
            max_chars,
            vec![
                Box::new(TextLayer),
                Box::new(PageWalker { max_pages: fallback_pages }),
            ],
        )
    }

    pub fn with_sources(max_chars: usize, sources: Vec<Box<dyn PdfTextSource>>) -> Self {
        Self { max_chars, sources }
    }

    pub fn extract(&self, path: &Path) -> Option<String> {
        match std::fs::read(path) {
            Ok(bytes) => self.extract_bytes(&bytes),
            Err(e) => {
                warn!("Cannot read PDF {:?}: {}", path, e);
                None
            }
        }
    }

    /// Try each source in turn; the first one with non-blank text wins
    pub fn extract_bytes(&self, bytes: &[u8]) -> Option<String> {
        for source in &self.sources {
            // pdf-extract can panic on malformed fonts
            let attempt = catch_unwind(AssertUnwindSafe(|| source.extract(bytes, self.max_chars)));
            match attempt {
                Ok(Ok(Some(text))) => {
                    info!("  > {} extracted {} characters", source.name(), text.chars().count());
                    return Some(text);
                }
                Ok(Ok(None)) => {
                    info!("  > {} found no text, trying next extractor", source.name());
                }
                Ok(Err(e)) => {
                    warn!("  > {} failed: {}", source.name(), e);
                }
                Err(_) => {
                    warn!("  > {} panicked on this document", source.name());
                }
            }
        }
        None
    }
}
