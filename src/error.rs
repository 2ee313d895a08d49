// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for retitle

use thiserror::Error;

/// Result type alias for retitle operations
pub type Result<T> = std::result::Result<T, RetitleError>;

/// retitle error types
#[derive(Error, Debug)]
pub enum RetitleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Cannot decode text: {0}")]
    Decode(String),

    #[error("No free file name for '{0}' after {1} attempts")]
    NameExhausted(String, u32),
}
