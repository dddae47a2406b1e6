//! Scripted backend for use-case tests.

use crate::ports::llm_gateway::{GatewayError, LlmGateway, StreamHandle};
use async_trait::async_trait;
use consensus_domain::{
    ExpertKind, GenerateRequest, GenerateResponse, MediaJob, MediaJobRequest, MediaJobStatus,
    StreamEvent,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Which pipeline stage a request belongs to, recovered from its prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Framing,
    Router,
    Judge,
    Critic,
    Worker,
}

pub(crate) fn call_kind(request: &GenerateRequest) -> CallKind {
    let system = request.system_instruction.as_deref().unwrap_or_default();
    if system.contains("Framing Detection Agent") {
        CallKind::Framing
    } else if request.json_output && request.text().contains("selectedIds") {
        CallKind::Router
    } else if system.contains("Synthesis Judge") {
        CallKind::Judge
    } else if system.contains("Consensus Auditor") {
        CallKind::Critic
    } else {
        CallKind::Worker
    }
}

type Handler = Box<dyn Fn(&GenerateRequest) -> Result<GenerateResponse, GatewayError> + Send + Sync>;

pub(crate) struct ScriptedGateway {
    handler: Handler,
    stream: Option<Vec<StreamEvent>>,
    stream_open_error: Option<GatewayError>,
    media_credentials: bool,
    polls_until_done: usize,
    video_uri: Option<String>,
    polls: AtomicUsize,
    delay: Option<Duration>,
    calls: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedGateway {
    pub(crate) fn new(
        handler: impl Fn(&GenerateRequest) -> Result<GenerateResponse, GatewayError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            stream: None,
            stream_open_error: None,
            media_credentials: false,
            polls_until_done: 0,
            video_uri: None,
            polls: AtomicUsize::new(0),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Judge stream yields exactly these events
    pub(crate) fn with_stream(mut self, events: Vec<StreamEvent>) -> Self {
        self.stream = Some(events);
        self
    }

    pub(crate) fn with_stream_open_error(mut self, error: GatewayError) -> Self {
        self.stream_open_error = Some(error);
        self
    }

    pub(crate) fn with_video(mut self, polls_until_done: usize, uri: Option<&str>) -> Self {
        self.media_credentials = true;
        self.polls_until_done = polls_until_done;
        self.video_uri = uri.map(str::to_string);
        self
    }

    /// Every generate call sleeps this long before answering
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub(crate) fn calls(&self) -> Vec<GenerateRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_of(&self, kind: CallKind) -> Vec<GenerateRequest> {
        self.calls()
            .into_iter()
            .filter(|r| call_kind(r) == kind)
            .collect()
    }

    pub(crate) fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        self.calls.lock().unwrap().push(request.clone());
        self.wait().await;
        (self.handler)(request)
    }

    async fn generate_stream(&self, request: &GenerateRequest) -> Result<StreamHandle, GatewayError> {
        self.calls.lock().unwrap().push(request.clone());
        self.wait().await;
        if let Some(error) = &self.stream_open_error {
            return Err(error.clone());
        }
        let events = match &self.stream {
            Some(events) => events.clone(),
            None => vec![StreamEvent::Completed((self.handler)(request)?.text)],
        };
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            tx.send(event).await.unwrap();
        }
        Ok(StreamHandle::new(rx))
    }

    async fn submit_media_job(&self, request: &MediaJobRequest) -> Result<MediaJob, GatewayError> {
        Ok(MediaJob::new(format!("operations/{}", request.model)))
    }

    async fn poll_media_job(&self, _job: &MediaJob) -> Result<MediaJobStatus, GatewayError> {
        let seen = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if seen >= self.polls_until_done {
            Ok(MediaJobStatus::Done {
                video_uri: self.video_uri.clone(),
            })
        } else {
            Ok(MediaJobStatus::Running)
        }
    }

    fn has_media_credentials(&self, kind: ExpertKind) -> bool {
        kind == ExpertKind::Video && self.media_credentials
    }
}
