// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Gemini `generateContent` client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::extract::ImagePayload;
use crate::Result;

/// What to send to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Text(String),
    Image { instructions: String, image: ImagePayload },
}

/// Failure of a single generation call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// 5xx answer from the service
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Any other non-success answer
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never got an answer
    #[error("transport error: {0}")]
    Transport(String),

    /// The answer could not be understood
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ModelError {
    /// HTTP status, present only for failures reported by the API itself
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Transport(_) | Self::Malformed(_) => None,
        }
    }
}

/// A remote model that turns a prompt (and optionally an image) into text
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, ModelError>;
}

#[async_trait]
impl<T: GenerativeModel + ?Sized> GenerativeModel for Arc<T> {
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, ModelError> {
        (**self).generate(request).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

impl GenerateContentResponse {
    /// Text of the first candidate, thought parts excluded
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Best-effort readable message from an error body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if envelope.error.status.is_empty() => envelope.error.message,
        Ok(envelope) => format!("{} ({})", envelope.error.message, envelope.error.status),
        Err(_) => body.chars().take(200).collect(),
    }
}

/// Gemini REST client
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: &str, config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }

    fn body(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let parts = match request {
            GenerationRequest::Text(prompt) => vec![Part::Text { text: prompt.clone() }],
            GenerationRequest::Image { instructions, image } => vec![
                Part::Text { text: instructions.clone() },
                Part::InlineData {
                    inline_data: Blob {
                        mime_type: image.mime_type.clone(),
                        data: image.data.clone(),
                    },
                },
            ],
        };

        GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, ModelError> {
        debug!("Sending request to Gemini: model={}", self.model);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            return Err(if status.is_server_error() {
                ModelError::Server { status: status.as_u16(), message }
            } else {
                ModelError::Api { status: status.as_u16(), message }
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;

        parsed
            .text()
            .ok_or_else(|| ModelError::Malformed("no text in the first candidate".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", &GeminiConfig::default()).unwrap()
    }

    #[test]
    fn url_targets_configured_model() {
        assert_eq!(
            client().url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn text_request_shape() {
        let body = serde_json::to_value(client().body(&GenerationRequest::Text("hi".into()))).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
    }

    #[test]
    fn image_request_puts_prompt_before_image() {
        let request = GenerationRequest::Image {
            instructions: "describe".into(),
            image: ImagePayload { mime_type: "image/jpeg".into(), data: "AAAA".into() },
        };
        let body = serde_json::to_value(client().body(&request)).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "AAAA");
    }

    #[test]
    fn response_text_skips_thoughts() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"thinking...","thought":true},
                {"text":"Manuale Strategia "},{"text":"Trading"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Manuale Strategia Trading"));
    }

    #[test]
    fn blocked_response_has_no_text() {
        let parsed: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(parsed.text().is_none());
    }

    #[test]
    fn error_body_is_summarised() {
        let body = r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#;
        assert_eq!(error_message(body), "The model is overloaded. (UNAVAILABLE)");
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn status_only_for_api_failures() {
        assert_eq!(ModelError::Server { status: 503, message: String::new() }.status(), Some(503));
        assert_eq!(ModelError::Api { status: 400, message: String::new() }.status(), Some(400));
        assert_eq!(ModelError::Transport("reset".into()).status(), None);
    }
}
