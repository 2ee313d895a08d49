// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Content extraction for the supported file kinds
//!
//! Every file is classified by extension into a [`ContentKind`]; each kind has
//! exactly one extraction strategy. Text strategies accumulate their units
//! (lines, paragraphs, pages, cells) into a [`TextBudget`] and stop as soon as
//! the character cap is reached.

pub mod document;
pub mod image;
pub mod pdf;
pub mod spreadsheet;
pub mod text;

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::Result;

/// Supported content kind, selected purely from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Pdf,
    Document,
    PlainText,
    Spreadsheet,
    Image,
    Unsupported,
}

/// Coarse category used by the rename loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCategory {
    Text,
    Image,
    Unsupported,
}

impl ContentKind {
    /// Map a lower-case extension (without the dot) to its kind
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "pdf" => Self::Pdf,
            "docx" => Self::Document,
            "txt" => Self::PlainText,
            "xlsx" | "xls" => Self::Spreadsheet,
            "png" | "jpg" | "jpeg" | "bmp" | "webp" => Self::Image,
            _ => Self::Unsupported,
        }
    }

    pub fn category(self) -> ContentCategory {
        match self {
            Self::Pdf | Self::Document | Self::PlainText | Self::Spreadsheet => ContentCategory::Text,
            Self::Image => ContentCategory::Image,
            Self::Unsupported => ContentCategory::Unsupported,
        }
    }
}

/// One directory entry scheduled for processing
#[derive(Debug, Clone)]
pub struct FileTask {
    pub path: PathBuf,
    /// File name without its extension
    pub base_name: String,
    /// Lower-cased extension including the leading dot, or empty
    pub extension: String,
    pub kind: ContentKind,
}

impl FileTask {
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?;
        let base_name = path
            .file_stem()
            .unwrap_or(file_name)
            .to_string_lossy()
            .into_owned();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let kind = ContentKind::from_extension(&ext);
        let extension = if ext.is_empty() { ext } else { format!(".{}", ext) };

        Some(Self {
            path: path.to_path_buf(),
            base_name,
            extension,
            kind,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory holding the file
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Image bytes ready to be attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Base64 (standard alphabet) encoded image data
    pub data: String,
}

impl ImagePayload {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        use base64::{engine::general_purpose, Engine as _};
        Self {
            mime_type: mime_type.to_string(),
            data: general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Representative content of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentExcerpt {
    Text(String),
    Image(ImagePayload),
}

/// Accumulates text units until a character cap is reached
#[derive(Debug)]
pub struct TextBudget {
    text: String,
    chars: usize,
    cap: usize,
}

impl TextBudget {
    pub fn new(cap: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            cap,
        }
    }

    /// Append a unit. Returns `false` once the cap has been reached.
    pub fn push(&mut self, unit: &str) -> bool {
        if self.is_full() {
            return false;
        }
        self.text.push_str(unit);
        self.chars += unit.chars().count();
        !self.is_full()
    }

    /// Append a unit followed by a newline
    pub fn push_line(&mut self, unit: &str) -> bool {
        self.push(unit) && self.push("\n")
    }

    pub fn is_full(&self) -> bool {
        self.chars >= self.cap
    }

    pub fn finish(self) -> Option<String> {
        finish_excerpt(&self.text, self.cap)
    }
}

/// Cut `text` to `cap` characters and trim it; whitespace-only yields `None`
pub fn finish_excerpt(text: &str, cap: usize) -> Option<String> {
    let truncated = match text.char_indices().nth(cap) {
        Some((idx, _)) => &text[..idx],
        None => text,
    };
    let trimmed = truncated.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Format-dispatching extractor
pub struct ContentExtractor {
    max_chars: usize,
    image_max_dimension: u32,
    pdf: pdf::PdfExtractor,
}

impl ContentExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_chars: config.max_chars,
            image_max_dimension: config.image_max_dimension,
            pdf: pdf::PdfExtractor::new(config.max_chars, config.pdf_fallback_pages),
        }
    }

    /// Extract representative content. Never fails: every error is logged
    /// and reported as `None`.
    pub fn extract(&self, task: &FileTask) -> Option<ContentExcerpt> {
        let result: Result<Option<ContentExcerpt>> = match task.kind {
            ContentKind::Pdf => Ok(self.pdf.extract(&task.path).map(ContentExcerpt::Text)),
            ContentKind::Document => document::extract_docx(&task.path, self.max_chars)
                .map(|t| t.map(ContentExcerpt::Text)),
            ContentKind::PlainText => text::extract_text(&task.path, self.max_chars)
                .map(|t| t.map(ContentExcerpt::Text)),
            ContentKind::Spreadsheet => spreadsheet::extract_spreadsheet(&task.path, self.max_chars)
                .map(|t| t.map(ContentExcerpt::Text)),
            ContentKind::Image => image::load_image(&task.path, self.image_max_dimension)
                .map(|p| Some(ContentExcerpt::Image(p))),
            ContentKind::Unsupported => {
                debug!("No extractor for {:?}", task.path);
                Ok(None)
            }
        };

        match result {
            Ok(Some(excerpt)) => Some(excerpt),
            Ok(None) => {
                debug!("No usable content in '{}'", task.file_name());
                None
            }
            Err(e) => {
                warn!("Could not read '{}': {}", task.file_name(), e);
                None
            }
        }
    }
}
