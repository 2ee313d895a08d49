// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! DOCX text extraction, one paragraph at a time

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;

use super::TextBudget;
use crate::Result;

/// Extract paragraph text from a DOCX file
pub fn extract_docx(path: &Path, max_chars: usize) -> Result<Option<String>> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    // DOCX stores the body in word/document.xml
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;

    paragraphs(&xml, max_chars)
}

/// Walk WordprocessingML, emitting each `w:p` as one unit
fn paragraphs(xml: &str, max_chars: usize) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    let mut budget = TextBudget::new(max_chars);
    let mut paragraph = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:r" => in_run = true,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:r" => in_run = false,
                b"w:t" => in_text = false,
                b"w:p" => {
                    if !budget.push_line(&paragraph) {
                        break;
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            // Outside a run, w:tab is a tab stop definition in w:pPr
            Event::Empty(e) if in_run => match e.name().as_ref() {
                b"w:tab" => paragraph.push('\t'),
                b"w:br" | b"w:cr" => paragraph.push(' '),
                _ => {}
            },
            Event::Text(t) if in_text => paragraph.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(budget.finish())
}
