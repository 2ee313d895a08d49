// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for retitle

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Directory whose files get renamed (CLI and environment take precedence)
    #[serde(default)]
    pub target_dir: Option<String>,

    /// Gemini endpoint settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Backoff settings for the inference call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Content extraction limits
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Naming rules
    #[serde(default)]
    pub rename: RenameConfig,

    /// Prompt settings
    #[serde(default)]
    pub prompts: PromptConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeminiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// The only HTTP status that is retried
    #[serde(default = "default_retry_status")]
    pub retry_status: u16,
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_pdf_fallback_pages")]
    pub pdf_fallback_pages: usize,
    #[serde(default = "default_image_max_dimension")]
    pub image_max_dimension: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RenameConfig {
    #[serde(default = "default_max_title_chars")]
    pub max_title_chars: usize,
    #[serde(default = "default_max_collision_suffix")]
    pub max_collision_suffix: u32,
    /// Pause after every inference call, in milliseconds
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_max_words")]
    pub max_words: u32,
}

// Default value functions
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}
fn default_model() -> String { "gemini-2.5-flash".to_string() }
fn default_temperature() -> f32 { 0.2 }
fn default_timeout() -> u64 { 120 }
fn default_max_attempts() -> u32 { 5 }
fn default_retry_status() -> u16 { 503 }
fn default_base_delay() -> u64 { 2 }
fn default_max_chars() -> usize { 10_000 }
fn default_pdf_fallback_pages() -> usize { 50 }
fn default_image_max_dimension() -> u32 { 1024 }
fn default_max_title_chars() -> usize { 150 }
fn default_max_collision_suffix() -> u32 { 9_999 }
fn default_pause_ms() -> u64 { 500 }
fn default_language() -> String { "Italian".to_string() }
fn default_max_words() -> u32 { 8 }

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_status: default_retry_status(),
            base_delay_secs: default_base_delay(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            pdf_fallback_pages: default_pdf_fallback_pages(),
            image_max_dimension: default_image_max_dimension(),
        }
    }
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            max_title_chars: default_max_title_chars(),
            max_collision_suffix: default_max_collision_suffix(),
            pause_ms: default_pause_ms(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            max_words: default_max_words(),
        }
    }
}

impl RenameConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::RetitleError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> crate::Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(crate::RetitleError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.extraction.max_chars == 0 {
            return Err(crate::RetitleError::Config("extraction.max_chars must be at least 1".to_string()));
        }
        if self.extraction.pdf_fallback_pages == 0 {
            return Err(crate::RetitleError::Config("extraction.pdf_fallback_pages must be at least 1".to_string()));
        }
        if self.extraction.image_max_dimension == 0 {
            return Err(crate::RetitleError::Config("extraction.image_max_dimension must be at least 1".to_string()));
        }
        if self.rename.max_title_chars == 0 {
            return Err(crate::RetitleError::Config("rename.max_title_chars must be at least 1".to_string()));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(crate::RetitleError::Config("gemini.model must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Pick the directory to process: an explicit value wins over the config
/// file. The directory must exist.
pub fn resolve_target_dir(explicit: Option<PathBuf>, config: &AppConfig) -> crate::Result<PathBuf> {
    let dir = explicit
        .or_else(|| config.target_dir.as_ref().map(PathBuf::from))
        .ok_or_else(|| {
            crate::RetitleError::Config(
                "no target directory: pass --dir, set RETITLE_DIR or add target_dir to the config".to_string(),
            )
        })?;

    if !dir.is_dir() {
        return Err(crate::RetitleError::Config(format!(
            "target directory {:?} does not exist or is not a directory",
            dir
        )));
    }
    Ok(dir)
}
