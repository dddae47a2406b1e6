//! LLM Gateway port
//!
//! Defines the interface for communicating with the language-model backend.

use async_trait::async_trait;
use consensus_domain::{
    ExpertKind, GenerateRequest, GenerateResponse, MediaJob, MediaJobRequest, MediaJobStatus,
    StreamEvent,
};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Backend asked us to slow down (HTTP 429, `RESOURCE_EXHAUSTED`, quota)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Timeout")]
    Timeout,
}

impl GatewayError {
    /// Only rate-limit failures are worth retrying.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GatewayError::RateLimited(_))
    }

    /// Wrap a backend failure, promoting rate-limit signals.
    pub fn from_backend(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == Some(429) || looks_rate_limited(&message) {
            GatewayError::RateLimited(message)
        } else {
            GatewayError::RequestFailed(message)
        }
    }
}

/// Rate-limit markers in backend error text. The HTTP status is checked
/// separately; digits in the text are never trusted.
fn looks_rate_limited(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("resource_exhausted") || lower.contains("quota")
}

/// Gateway for backend communication
///
/// This port defines how the application layer talks to the model backend.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Single request/response call
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError>;

    /// Streaming call.
    ///
    /// Default implementation calls `generate()` and wraps the result in a
    /// single `Completed` event.
    async fn generate_stream(&self, request: &GenerateRequest) -> Result<StreamHandle, GatewayError> {
        let response = self.generate(request).await?;
        let (tx, rx) = mpsc::channel(1);
        // Receiver may already be gone; nothing to do then
        let _ = tx.send(StreamEvent::Completed(response.text)).await;
        Ok(StreamHandle::new(rx))
    }

    /// Start a long-running media job
    async fn submit_media_job(&self, request: &MediaJobRequest) -> Result<MediaJob, GatewayError> {
        Err(GatewayError::Unsupported(format!(
            "media jobs for {}",
            request.model
        )))
    }

    /// Check the state of a submitted job
    async fn poll_media_job(&self, job: &MediaJob) -> Result<MediaJobStatus, GatewayError> {
        Err(GatewayError::Unsupported(format!("polling {}", job.name)))
    }

    /// Whether a credential usable for this modality is configured
    fn has_media_credentials(&self, _kind: ExpertKind) -> bool {
        false
    }
}

/// Handle for receiving streaming events from the backend.
///
/// Wraps an `mpsc::Receiver<StreamEvent>` and provides convenience methods
/// for consuming the stream.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Next event, or `None` once the sender is gone
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(mut self) -> Result<String, GatewayError> {
        let mut full_text = String::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => full_text.push_str(&chunk),
                StreamEvent::Completed(text) => {
                    if full_text.is_empty() {
                        return Ok(text);
                    }
                    return Ok(full_text);
                }
                StreamEvent::Error(e) => return Err(GatewayError::RequestFailed(e)),
            }
        }
        // Channel closed without Completed; return what we have
        Ok(full_text)
    }
}
