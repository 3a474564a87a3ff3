//! Notification sink and text-generation collaborator clients.
//!
//! Both collaborators are external HTTP services with opaque internals; the
//! clients here bound every call with a timeout and classify failures so the
//! pipeline can retry transient ones and degrade on the rest.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const CRATE_NAME: &str = "getaway-notify";

/// Failure taxonomy of the text-generation collaborator.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The service or region cannot be reached at all.
    #[error("text-generation service unavailable: {0}")]
    Unavailable(String),
    #[error("text-generation request timed out")]
    Timeout,
    #[error("text-generation http status {status}")]
    Http { status: u16 },
    #[error("invalid text-generation response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(String),
    #[error("notification http status {status}")]
    Http { status: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

pub fn classify_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_generation_error(err: &GenerationError) -> RetryDisposition {
    match err {
        GenerationError::Unavailable(_) | GenerationError::Timeout => RetryDisposition::Retryable,
        GenerationError::Http { status } => {
            if *status >= 500 || *status == 429 {
                RetryDisposition::Retryable
            } else {
                RetryDisposition::NonRetryable
            }
        }
        GenerationError::InvalidResponse(_) => RetryDisposition::NonRetryable,
    }
}

pub fn classify_notify_error(err: &NotifyError) -> RetryDisposition {
    match err {
        NotifyError::Request(_) => RetryDisposition::Retryable,
        NotifyError::Http { status } => {
            if *status >= 500 || *status == 429 {
                RetryDisposition::Retryable
            } else {
                RetryDisposition::NonRetryable
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Bounded-retry wrapper around the generation call. Transient failures
/// back off exponentially; non-retryable ones surface immediately.
pub async fn complete_with_retry(
    generator: &dyn TextGenerator,
    prompt: &str,
    backoff: &BackoffPolicy,
) -> Result<String, GenerationError> {
    let mut last_err = None;
    for attempt in 0..=backoff.max_retries {
        match generator.complete(prompt).await {
            Ok(text) => return Ok(text),
            Err(err) => {
                if classify_generation_error(&err) == RetryDisposition::Retryable
                    && attempt < backoff.max_retries
                {
                    warn!(attempt, error = %err, "text generation failed; retrying");
                    tokio::time::sleep(backoff.delay_for_attempt(attempt)).await;
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
        }
    }
    Err(last_err.expect("retry loop should capture an error"))
}

pub async fn send_with_retry(
    notifier: &dyn Notifier,
    recipient: &str,
    subject: &str,
    body: &str,
    backoff: &BackoffPolicy,
) -> Result<(), NotifyError> {
    let mut last_err = None;
    for attempt in 0..=backoff.max_retries {
        match notifier.send(recipient, subject, body).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                if classify_notify_error(&err) == RetryDisposition::Retryable
                    && attempt < backoff.max_retries
                {
                    warn!(attempt, error = %err, "notification send failed; retrying");
                    tokio::time::sleep(backoff.delay_for_attempt(attempt)).await;
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
        }
    }
    Err(last_err.expect("retry loop should capture an error"))
}

#[derive(Debug, Clone)]
pub struct TextGeneratorConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP client for the hosted completion endpoint.
pub struct HttpTextGenerator {
    client: reqwest::Client,
    config: TextGeneratorConfig,
}

impl HttpTextGenerator {
    pub fn new(config: TextGeneratorConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("building text-generation http client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Unavailable(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Http {
                status: status.as_u16(),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::InvalidResponse(err.to_string()))?;
        if parsed.response.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(
                "empty completion".to_string(),
            ));
        }
        Ok(parsed.response)
    }
}

#[derive(Debug, Clone)]
pub struct MailGatewayConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Notification sink backed by an HTTP mail gateway. Delivery beyond the
/// gateway is out-of-band and opaque.
pub struct HttpMailNotifier {
    client: reqwest::Client,
    config: MailGatewayConfig,
}

impl HttpMailNotifier {
    pub fn new(config: MailGatewayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("building mail-gateway http client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for HttpMailNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let request = MailRequest {
            to: recipient,
            subject,
            body,
        };
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| NotifyError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Http {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Dry-run sink: logs the notification instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!(recipient, subject, body_chars = body.len(), "dry-run notification");
        Ok(())
    }
}

/// Dry-run generator: returns canned text without calling the service.
#[derive(Debug, Clone)]
pub struct StaticTextGenerator {
    pub text: String,
}

impl StaticTextGenerator {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl TextGenerator for StaticTextGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok(self.text.clone())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PromptTemplate {
    VacationRecommendation,
}

impl PromptTemplate {
    pub fn template(&self) -> &'static str {
        match self {
            PromptTemplate::VacationRecommendation => {
                r#"You are a travel planning assistant. The JSON below lists candidate
vacation destinations with their average flight carbon emissions per person,
flight punctuality, two-week weather forecast, and attraction counts.

{spots}

Recommend the single best destination for a relaxing city trip, name one or
two runner-ups, and explain the trade-offs in two short paragraphs. Mention
the weather and the flight punctuality in your reasoning."#
            }
        }
    }

    pub fn render(&self, spots_json: &str) -> String {
        self.template().replace("{spots}", spots_json)
    }
}
