//! Gather Workers use case
//!
//! Runs one backend call per selected expert, concurrently. Launches are
//! staggered, rate-limited calls are retried with backoff, and each
//! expert's failure (including a panic in its task) stays local to its own
//! result slot.

use crate::config::{PipelineConfig, RetryPolicy};
use crate::ports::llm_gateway::{GatewayError, LlmGateway};
use consensus_domain::{
    ExpertKind, ExpertProfile, ExpertTool, FileAttachment, FramingProfile, GenerateRequest,
    HistorySnapshot, MediaJobRequest, MediaJobStatus, PromptTemplate, UserPreferences,
    WorkerOutcome, WorkerOutput, WorkerResult, estimate_tokens, extract_action_draft,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const IMAGE_TOKENS: u32 = 250;
const VIDEO_TOKENS: u32 = 500;

/// Read-only inputs shared by every worker of a turn
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub prompt: String,
    pub attachments: Vec<FileAttachment>,
    pub history: HistorySnapshot,
    pub preferences: Option<UserPreferences>,
    pub framing: FramingProfile,
}

pub struct GatherWorkersUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    stagger_interval: Duration,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl<G: LlmGateway + 'static> GatherWorkersUseCase<G> {
    pub fn new(gateway: Arc<G>, config: &PipelineConfig) -> Self {
        Self {
            gateway,
            stagger_interval: config.stagger_interval,
            poll_interval: config.poll_interval,
            retry: config.retry.clone(),
        }
    }

    /// Settle every pending result in `results`.
    ///
    /// `on_update` receives the full ordered list after each completion.
    /// Returns once every worker has settled.
    pub async fn execute(
        &self,
        context: Arc<WorkerContext>,
        mut results: Vec<WorkerResult>,
        on_update: &mut (dyn FnMut(&[WorkerResult]) + Send),
    ) -> Vec<WorkerResult> {
        info!("Dispatching {} workers", results.len());

        let mut join_set = JoinSet::new();
        let mut slots = HashMap::new();

        for (index, result) in results.iter().enumerate() {
            let worker = Worker {
                gateway: Arc::clone(&self.gateway),
                retry: self.retry.clone(),
                poll_interval: self.poll_interval,
            };
            let expert = result.expert.clone();
            let context = Arc::clone(&context);
            let delay = self
                .stagger_interval
                .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));

            let handle = join_set.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                worker.run(&expert, &context).await
            });
            slots.insert(handle.id(), index);
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(e) => {
                    warn!("Worker task failed: {}", e);
                    (e.id(), WorkerOutcome::failure(format!("worker task failed: {e}")))
                }
            };
            let Some(&index) = slots.get(&id) else {
                warn!("Completion from unknown worker task {}", id);
                continue;
            };

            let slot = &mut results[index];
            match &outcome {
                WorkerOutcome::Success(_) => info!("Expert {} responded", slot.expert.id),
                WorkerOutcome::Failure { message, .. } => {
                    warn!("Expert {} failed: {}", slot.expert.id, message)
                }
            }
            if let Err(e) = slot.resolve(outcome) {
                warn!("Ignoring duplicate completion: {}", e);
                continue;
            }
            on_update(&results);
        }

        results
    }
}

/// Per-task executor; owns everything it needs so it can be spawned.
struct Worker<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    retry: RetryPolicy,
    poll_interval: Duration,
}

impl<G: LlmGateway + 'static> Worker<G> {
    async fn run(&self, expert: &ExpertProfile, context: &WorkerContext) -> WorkerOutcome {
        if expert.kind == ExpertKind::Video && !self.gateway.has_media_credentials(ExpertKind::Video)
        {
            return WorkerOutcome::needs_configuration(
                "Video generation needs an API key with video access. Set backend.video_api_key \
                 or enable backend.video_enabled.",
            );
        }

        let started = Instant::now();
        let output = match expert.kind {
            ExpertKind::Video => self.run_video(expert, context).await,
            ExpertKind::Image => self.run_image(expert, context).await,
            ExpertKind::Text | ExpertKind::Action | ExpertKind::Critic => {
                self.run_text(expert, context).await
            }
        };

        match output {
            Ok(output) => {
                let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                WorkerOutcome::Success(output.with_execution_time_ms(elapsed))
            }
            Err(e) => WorkerOutcome::failure(e.to_string()),
        }
    }

    async fn run_text(
        &self,
        expert: &ExpertProfile,
        context: &WorkerContext,
    ) -> Result<WorkerOutput, GatewayError> {
        let request = GenerateRequest::new(expert.model.clone())
            .with_system(PromptTemplate::worker_system(&context.framing, expert))
            .with_attachments(&context.attachments)
            .with_text(PromptTemplate::worker_user(
                &context.prompt,
                &context.history,
                context.preferences.as_ref(),
            ))
            .with_web_search(expert.has_tool(ExpertTool::WebSearch));

        let response = self
            .with_retry(&expert.id, || self.gateway.generate(&request))
            .await?;

        let action_draft = extract_action_draft(&response.text);
        if action_draft.is_some() {
            debug!("Expert {} drafted an action", expert.id);
        }
        let tokens = estimate_tokens(&response.text);
        Ok(WorkerOutput::text(response.text, tokens)
            .with_citations(response.citations)
            .with_action_draft(action_draft))
    }

    async fn run_image(
        &self,
        expert: &ExpertProfile,
        context: &WorkerContext,
    ) -> Result<WorkerOutput, GatewayError> {
        let request = GenerateRequest::new(expert.model.clone()).with_text(context.prompt.clone());
        let response = self
            .with_retry(&expert.id, || self.gateway.generate(&request))
            .await?;

        let images = response.images();
        let content = if !images.is_empty() {
            "Image generated.".to_string()
        } else if response.text.trim().is_empty() {
            "No image was returned.".to_string()
        } else {
            format!("No image was returned: {}", response.text.trim())
        };
        Ok(WorkerOutput::text(content, IMAGE_TOKENS).with_images(images))
    }

    async fn run_video(
        &self,
        expert: &ExpertProfile,
        context: &WorkerContext,
    ) -> Result<WorkerOutput, GatewayError> {
        let request = MediaJobRequest::video(expert.model.clone(), context.prompt.clone());
        let job = self
            .with_retry(&expert.id, || self.gateway.submit_media_job(&request))
            .await?;
        info!("Expert {} submitted video job {}", expert.id, job.name);

        let video_uri = loop {
            tokio::time::sleep(self.poll_interval).await;
            match self
                .with_retry(&expert.id, || self.gateway.poll_media_job(&job))
                .await?
            {
                MediaJobStatus::Running => debug!("Video job {} still running", job.name),
                MediaJobStatus::Done { video_uri } => break video_uri,
            }
        };

        let Some(uri) = video_uri else {
            return Err(GatewayError::InvalidResponse(
                "video job finished without a video".to_string(),
            ));
        };
        Ok(WorkerOutput::text("Video generated.", VIDEO_TOKENS).with_video_uri(Some(uri)))
    }

    /// Run `call`, retrying rate-limit failures per the policy.
    async fn with_retry<T, F, Fut>(&self, expert_id: &str, mut call: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match call().await {
                Err(e) if e.is_rate_limited() && self.retry.should_retry(attempts) => {
                    let wait = self.retry.delay(attempts - 1);
                    warn!(
                        "Expert {} rate-limited (attempt {}/{}), retrying in {:?}",
                        expert_id, attempts, self.retry.max_attempts, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) if e.is_rate_limited() => {
                    warn!("Expert {} still rate-limited after {} attempts", expert_id, attempts);
                    return Err(e);
                }
                other => return other,
            }
        }
    }
}
