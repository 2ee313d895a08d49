// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Title inference with bounded retry
//!
//! Only one failure is worth waiting for: the service answering with the
//! configured "temporarily unavailable" status (503). Every other API error,
//! and every failure that never reached the API, ends the attempt at once.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{PromptConfig, RetryConfig};
use crate::extract::ContentExcerpt;
use crate::gemini::{GenerationRequest, GenerativeModel, ModelError};

/// Something that can suspend the run for a while
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl<T: Sleeper + ?Sized> Sleeper for Arc<T> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

/// Where the retry loop stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    Attempting(u32),
    Success(String),
    PermanentFailure,
}

/// What to do after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReturnSuccess,
    SleepAndRetry(Duration),
    ReturnFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_status: u16,
    pub base_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            retry_status: config.retry_status,
            base_delay_secs: config.base_delay_secs,
        }
    }
}

impl RetryPolicy {
    /// Decide the next step after attempt number `attempt` (1-based)
    pub fn next_action(&self, attempt: u32, failure: Option<&ModelError>) -> Action {
        match failure {
            None => Action::ReturnSuccess,
            Some(error) if self.is_transient(error) && attempt < self.max_attempts => {
                Action::SleepAndRetry(self.delay_for(attempt))
            }
            Some(_) => Action::ReturnFailure,
        }
    }

    pub fn is_transient(&self, error: &ModelError) -> bool {
        error.status() == Some(self.retry_status)
    }

    /// `base^attempt` seconds
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.base_delay_secs.saturating_pow(attempt))
    }
}

/// Builds the instructional prompts
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: String,
    max_words: u32,
}

impl From<&PromptConfig> for PromptBuilder {
    fn from(config: &PromptConfig) -> Self {
        Self {
            language: config.language.clone(),
            max_words: config.max_words,
        }
    }
}

impl PromptBuilder {
    pub fn text_prompt(&self, excerpt: &str) -> String {
        format!(
            r#"You are a file archiving assistant. Your goal is to create a completely new, clean and readable title in {language} for a document, based on its content.

TEXT EXTRACTED FROM THE DOCUMENT:
"{excerpt}"

INSTRUCTIONS:
1. Analyze the content: read the text and identify its main subject.
2. Ignore codes and file names: the text may contain old titles, codes or file names (such as 'V75STRATEGYKILLER', '540086610', 'MMTC-Student-s-Manual'). Ignore these literal strings.
3. Write a descriptive title: instead of copying, write a new title that describes the subject clearly and professionally.
   * If the text is about 'V75STRATEGYKILLER', a good title is 'V75 Index Trading Strategy'.
   * If the text is 'MMTC-Student-s-Manual-2021', a good title is 'MMTC Student Manual 2021'.
4. Format: the title must be in {language}, concise (at most {max_words} words) and clean.

Reply ONLY with the new descriptive title."#,
            language = self.language,
            excerpt = excerpt,
            max_words = self.max_words,
        )
    }

    pub fn image_prompt(&self) -> String {
        format!(
            r#"You are a file archiving assistant. Your goal is to create a completely new, clean and readable title in {language}, based on the content of this image.

INSTRUCTIONS:
1. Analyze the image: identify the main subject, action or theme.
2. Write a descriptive title that describes what is shown.
   * A stock chart: 'Stock Chart with Moving Averages'.
   * A photo of a cat: 'Tabby Cat Sleeping'.
   * A software screenshot: 'Software Interface Screenshot'.
3. Format: the title must be in {language}, concise (at most {max_words} words) and clean. Do not include the original file name.

Reply ONLY with the new descriptive title."#,
            language = self.language,
            max_words = self.max_words,
        )
    }
}

/// Asks the model for a title, retrying only transient unavailability
pub struct TitleInferenceClient<M, S> {
    model: M,
    sleeper: S,
    policy: RetryPolicy,
    prompts: PromptBuilder,
}

impl<M: GenerativeModel, S: Sleeper> TitleInferenceClient<M, S> {
    pub fn new(model: M, sleeper: S, policy: RetryPolicy, prompts: PromptBuilder) -> Self {
        Self {
            model,
            sleeper,
            policy,
            prompts,
        }
    }

    /// Infer a title from a text excerpt or an image
    pub async fn infer_title(&self, excerpt: &ContentExcerpt) -> Option<String> {
        let request = match excerpt {
            ContentExcerpt::Text(text) => GenerationRequest::Text(self.prompts.text_prompt(text)),
            ContentExcerpt::Image(image) => GenerationRequest::Image {
                instructions: self.prompts.image_prompt(),
                image: image.clone(),
            },
        };
        self.generate_with_retry(&request).await
    }

    pub async fn generate_with_retry(&self, request: &GenerationRequest) -> Option<String> {
        let mut state = RetryState::Attempting(1);

        loop {
            state = match state {
                RetryState::Attempting(attempt) => {
                    match self.model.generate(request).await.and_then(non_blank) {
                        Ok(title) => RetryState::Success(title),
                        Err(error) => match self.policy.next_action(attempt, Some(&error)) {
                            Action::SleepAndRetry(wait) => {
                                warn!(
                                    "  > [{}] attempt {}/{} failed, waiting {}s",
                                    self.policy.retry_status,
                                    attempt,
                                    self.policy.max_attempts,
                                    wait.as_secs()
                                );
                                self.sleeper.sleep(wait).await;
                                RetryState::Attempting(attempt + 1)
                            }
                            _ => {
                                log_failure(attempt, &error);
                                RetryState::PermanentFailure
                            }
                        },
                    }
                }
                RetryState::Success(title) => {
                    info!("  > Inferred title: '{}'", title);
                    return Some(title);
                }
                RetryState::PermanentFailure => return None,
            };
        }
    }
}

fn non_blank(text: String) -> Result<String, ModelError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ModelError::Malformed("empty title".to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

fn log_failure(attempt: u32, error: &ModelError) {
    match error.status() {
        Some(code) => warn!("Request failed with code {} after {} attempt(s): {}", code, attempt, error),
        None => warn!("Request failed without reaching the API: {}", error),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted answers in order; runs dry with a transport error
    #[derive(Default)]
    pub struct ScriptedModel {
        answers: Mutex<VecDeque<Result<String, ModelError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedModel {
        pub fn new(answers: Vec<Result<String, ModelError>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
            self.requests.lock().unwrap().push(request.clone());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ModelError::Transport("script exhausted".to_string())))
        }
    }

    #[derive(Default)]
    pub struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn slept(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    pub fn unavailable() -> ModelError {
        ModelError::Server { status: 503, message: "overloaded".to_string() }
    }
}
