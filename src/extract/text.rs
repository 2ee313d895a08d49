// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Plain text extraction with encoding detection by trial

use std::borrow::Cow;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use super::TextBudget;
use crate::{Result, RetitleError};

/// Candidate encodings, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Windows1252,
}

pub const ENCODINGS: [TextEncoding; 3] = [
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Windows1252,
];

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Windows1252 => "windows-1252",
        }
    }

    /// Strict decode. `truncated` tells the UTF-8 decoder that the input was
    /// cut by the read limit, so an incomplete trailing sequence is dropped
    /// instead of rejected.
    pub fn decode(self, bytes: &[u8], truncated: bool) -> Option<String> {
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                match std::str::from_utf8(bytes) {
                    Ok(s) => Some(s.to_owned()),
                    Err(e) if truncated && e.error_len().is_none() => {
                        std::str::from_utf8(&bytes[..e.valid_up_to()]).ok().map(str::to_owned)
                    }
                    Err(_) => None,
                }
            }
            Self::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
            Self::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned),
        }
    }
}

/// Decode with the first encoding that accepts the bytes
pub fn decode(bytes: &[u8], truncated: bool) -> Result<(String, TextEncoding)> {
    ENCODINGS
        .iter()
        .find_map(|enc| enc.decode(bytes, truncated).map(|text| (text, *enc)))
        .ok_or_else(|| RetitleError::Decode("no candidate encoding accepted the file".to_string()))
}

/// Extract up to `max_chars` characters of a text file, line by line
pub fn extract_text(path: &Path, max_chars: usize) -> Result<Option<String>> {
    // A character is at most four bytes in any candidate encoding
    let limit = max_chars.saturating_mul(4) as u64;

    let mut bytes = Vec::new();
    std::fs::File::open(path)?
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)?;

    let truncated = bytes.len() as u64 > limit;
    if truncated {
        bytes.truncate(limit as usize);
    }

    let (text, encoding) = decode(&bytes, truncated)?;
    debug!("Decoded {:?} as {}", path, encoding.label());

    let mut budget = TextBudget::new(max_chars);
    for line in text.split_inclusive('\n') {
        if !budget.push(line) {
            break;
        }
    }
    Ok(budget.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_is_preferred() {
        let (text, enc) = decode("Perché no".as_bytes(), false).unwrap();
        assert_eq!(text, "Perché no");
        assert_eq!(enc, TextEncoding::Utf8);
    }

    #[test]
    fn latin1_when_utf8_fails() {
        let (text, enc) = decode(b"Perch\xe9 no", false).unwrap();
        assert_eq!(text, "Perché no");
        assert_eq!(enc, TextEncoding::Latin1);
    }

    #[test]
    fn bom_is_stripped() {
        let (text, _) = decode(b"\xEF\xBB\xBFhello", false).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn cut_multibyte_sequence_is_dropped_only_when_truncated() {
        let bytes = "caffè".as_bytes();
        let cut = &bytes[..bytes.len() - 1];
        assert_eq!(TextEncoding::Utf8.decode(cut, true).as_deref(), Some("caff"));
        assert_eq!(TextEncoding::Utf8.decode(cut, false), None);
    }

    #[test]
    fn excerpt_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "abcdefghij\n".repeat(100)).unwrap();

        let text = extract_text(&path, 25).unwrap().unwrap();
        assert_eq!(text.chars().count(), 25);
    }

    #[test]
    fn default_cap_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.txt");
        std::fs::write(&path, "x".repeat(12_000)).unwrap();

        let text = extract_text(&path, 10_000).unwrap().unwrap();
        assert_eq!(text.len(), 10_000);
    }

    #[test]
    fn blank_file_has_no_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.txt");
        std::fs::write(&path, "  \n\n\t").unwrap();
        assert!(extract_text(&path, 100).unwrap().is_none());
    }
}
