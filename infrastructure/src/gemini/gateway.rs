//! Gemini LLM Gateway implementation

use super::client::{GeminiClient, GeminiSettings};
use super::error::GeminiError;
use super::protocol::{ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse, PredictRequest};
use async_trait::async_trait;
use consensus_application::ports::llm_gateway::{GatewayError, LlmGateway, StreamHandle};
use consensus_domain::{
    ExpertKind, GenerateRequest, GenerateResponse, MediaJob, MediaJobRequest, MediaJobStatus,
    StreamEvent,
};
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

const STREAM_BUFFER: usize = 64;

/// LLM Gateway implementation for the Gemini REST API
pub struct GeminiLlmGateway {
    client: GeminiClient,
    settings: GeminiSettings,
}

impl GeminiLlmGateway {
    pub fn new(settings: GeminiSettings) -> Result<Self, GeminiError> {
        let client = GeminiClient::new(&settings)?;
        info!(
            "GeminiLlmGateway initialized (video {})",
            if settings.video_key().is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );
        Ok(Self { client, settings })
    }

    fn api_key(&self) -> Result<&str, GeminiError> {
        self.settings
            .api_key
            .as_deref()
            .ok_or(GeminiError::MissingApiKey)
    }
}

#[async_trait]
impl LlmGateway for GeminiLlmGateway {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        let key = self.api_key()?;
        let body = GenerateContentRequest::from(request);
        debug!("generateContent on {}", request.model);
        let reply = self
            .client
            .generate_content(key, request.model.as_str(), &body)
            .await?;
        if reply.candidates.is_empty()
            && let Some(reason) = reply.block_reason()
        {
            return Err(GatewayError::RequestFailed(format!(
                "prompt blocked: {reason}"
            )));
        }
        Ok(reply.into_domain())
    }

    async fn generate_stream(&self, request: &GenerateRequest) -> Result<StreamHandle, GatewayError> {
        let key = self.api_key()?;
        let body = GenerateContentRequest::from(request);
        debug!("streamGenerateContent on {}", request.model);
        let response = self
            .client
            .stream_generate_content(key, request.model.as_str(), &body)
            .await?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(forward_events(response.bytes_stream(), tx));
        Ok(StreamHandle::new(rx))
    }

    async fn submit_media_job(&self, request: &MediaJobRequest) -> Result<MediaJob, GatewayError> {
        let key = self.settings.video_key().ok_or_else(|| {
            GatewayError::MissingCredentials(
                "video generation needs backend.video_api_key or backend.video_enabled".to_string(),
            )
        })?;
        let operation = self
            .client
            .predict_long_running(key, request.model.as_str(), &PredictRequest::from(request))
            .await?;
        if let Some(error) = operation.error {
            return Err(GatewayError::from_backend(Some(error.code), error.message));
        }
        if operation.name.is_empty() {
            return Err(GatewayError::InvalidResponse(
                "video job submitted without an operation name".to_string(),
            ));
        }
        info!("Submitted video job {}", operation.name);
        Ok(MediaJob::new(operation.name))
    }

    async fn poll_media_job(&self, job: &MediaJob) -> Result<MediaJobStatus, GatewayError> {
        let key = self.settings.video_key().ok_or_else(|| {
            GatewayError::MissingCredentials("video credentials disappeared".to_string())
        })?;
        let operation = self.client.get_operation(key, &job.name).await?;
        if let Some(error) = &operation.error {
            return Err(GatewayError::from_backend(
                Some(error.code),
                error.message.clone(),
            ));
        }
        let status = operation.status();
        trace!("Video job {} done={}", job.name, status.is_done());
        Ok(status)
    }

    fn has_media_credentials(&self, kind: ExpertKind) -> bool {
        match kind {
            ExpertKind::Video => self.settings.video_key().is_some(),
            _ => self.settings.api_key.is_some(),
        }
    }
}

/// Decode an SSE body into stream events.
///
/// Each `data:` line is one `GenerateContentResponse` chunk. Ends with
/// `Completed` holding the full text, or with a single `Error`.
async fn forward_events<S, B, E>(body: S, tx: mpsc::Sender<StreamEvent>)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut events = std::pin::pin!(body.eventsource());
    let mut full_text = String::new();

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!("SSE stream error: {}", e);
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return;
            }
        };
        if event.data.trim().is_empty() {
            continue;
        }
        if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(&event.data) {
            let error = GatewayError::from_backend(Some(envelope.error.code), envelope.error.message);
            let _ = tx.send(StreamEvent::Error(error.to_string())).await;
            return;
        }
        let chunk: GenerateContentResponse = match serde_json::from_str(&event.data) {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Error(format!("malformed stream chunk: {e}")))
                    .await;
                return;
            }
        };
        let text = chunk.text();
        if text.is_empty() {
            continue;
        }
        full_text.push_str(&text);
        if tx.send(StreamEvent::Delta(text)).await.is_err() {
            debug!("Stream consumer went away");
            return;
        }
    }

    let _ = tx.send(StreamEvent::Completed(full_text)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sse(chunks: &[&str]) -> impl Stream<Item = Result<String, std::io::Error>> {
        let frames: Vec<Result<String, std::io::Error>> = chunks
            .iter()
            .map(|data| Ok(format!("data: {data}\n\n")))
            .collect();
        futures::stream::iter(frames)
    }

    async fn collect(body: impl Stream<Item = Result<String, std::io::Error>>) -> Vec<StreamEvent> {
        let (tx, mut rx) = mpsc::channel(16);
        forward_events(body, tx).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_stream_deltas_then_completed() {
        let events = collect(sse(&[
            r#"{"candidates":[{"content":{"parts":[{"text":"Confidence: High\n"}]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"thinking","thought":true}]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"Answer"}]}}]}"#,
        ]))
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Delta("Confidence: High\n".to_string()),
                StreamEvent::Delta("Answer".to_string()),
                StreamEvent::Completed("Confidence: High\nAnswer".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_error_envelope_ends_stream() {
        let events = collect(sse(&[
            r#"{"candidates":[{"content":{"parts":[{"text":"Part"}]}}]}"#,
            r#"{"error":{"code":429,"message":"Resource exhausted","status":"RESOURCE_EXHAUSTED"}}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"never"}]}}]}"#,
        ]))
        .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::Delta("Part".to_string()));
        match &events[1] {
            StreamEvent::Error(message) => assert!(message.contains("Rate limited")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_chunk_is_error() {
        let events = collect(sse(&["{not json"])).await;
        assert!(matches!(events.as_slice(), [StreamEvent::Error(_)]));
    }

    #[test]
    fn test_media_credentials() {
        let gateway = GeminiLlmGateway::new(GeminiSettings {
            api_key: Some("k".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(gateway.has_media_credentials(ExpertKind::Image));
        assert!(!gateway.has_media_credentials(ExpertKind::Video));

        let gateway = GeminiLlmGateway::new(GeminiSettings {
            api_key: Some("k".to_string()),
            video_enabled: true,
            ..Default::default()
        })
        .unwrap();
        assert!(gateway.has_media_credentials(ExpertKind::Video));
    }

    #[tokio::test]
    async fn test_missing_key_is_credentials_error() {
        let gateway = GeminiLlmGateway::new(GeminiSettings::default()).unwrap();
        let err = gateway
            .generate(&GenerateRequest::new(consensus_domain::Model::Gemini3Flash).with_text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredentials(_)));
    }
}
