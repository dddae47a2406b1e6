//! Run Turn use case
//!
//! Drives one [`ChatTurn`] through
//! `framing → routing → gathering → judging → criticizing → complete`.
//! Each stage recovers from its own failures; only an invariant violation
//! escaping the stages moves the turn to `error`.

use crate::config::PipelineConfig;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::observer::{NoObserver, TurnObserver};
use crate::use_cases::critic_audit::{CriticAuditUseCase, CriticInput};
use crate::use_cases::detect_framing::DetectFramingUseCase;
use crate::use_cases::gather_workers::{GatherWorkersUseCase, WorkerContext};
use crate::use_cases::judge_synthesis::{JudgeInput, JudgeSynthesisUseCase};
use crate::use_cases::route_experts::{RouteExpertsInput, RouteExpertsUseCase};
use consensus_domain::{
    ChatTurn, DomainError, ExpertRegistry, FileAttachment, HistorySnapshot, UserPreferences,
    WorkerResult,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// The only failure text a user ever sees for a turn in `error`
pub const CRITICAL_FAILURE: &str = "Critical process failure.";

#[derive(Error, Debug)]
pub enum RunTurnError {
    #[error("Turn {turn_id} aborted: {source}")]
    Orchestration {
        turn_id: String,
        source: DomainError,
        /// The turn as left in the `error` stage
        turn: Box<ChatTurn>,
    },
}

impl RunTurnError {
    pub fn turn(&self) -> &ChatTurn {
        match self {
            RunTurnError::Orchestration { turn, .. } => turn,
        }
    }
}

/// Input for a fresh turn
#[derive(Debug, Clone, Default)]
pub struct RunTurnInput {
    pub prompt: String,
    pub attachments: Vec<FileAttachment>,
    pub history: HistorySnapshot,
    pub preferences: Option<UserPreferences>,
}

impl RunTurnInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<FileAttachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_history(mut self, history: HistorySnapshot) -> Self {
        self.history = history;
        self
    }

    pub fn with_preferences(mut self, preferences: UserPreferences) -> Self {
        self.preferences = Some(preferences);
        self
    }
}

/// Use case for running one turn end to end
pub struct RunTurnUseCase<G: LlmGateway + 'static> {
    framing: DetectFramingUseCase<G>,
    router: RouteExpertsUseCase<G>,
    workers: GatherWorkersUseCase<G>,
    judge: JudgeSynthesisUseCase<G>,
    critic: CriticAuditUseCase<G>,
    logger: Arc<dyn ConversationLogger>,
}

impl<G: LlmGateway + 'static> RunTurnUseCase<G> {
    pub fn new(gateway: Arc<G>, registry: Arc<ExpertRegistry>, config: &PipelineConfig) -> Self {
        Self {
            framing: DetectFramingUseCase::new(Arc::clone(&gateway), config),
            router: RouteExpertsUseCase::new(Arc::clone(&gateway), Arc::clone(&registry), config),
            workers: GatherWorkersUseCase::new(Arc::clone(&gateway), config),
            judge: JudgeSynthesisUseCase::new(Arc::clone(&gateway), config),
            critic: CriticAuditUseCase::new(gateway, registry),
            logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Execute with default (no-op) observer
    pub async fn execute(&self, input: RunTurnInput) -> Result<ChatTurn, RunTurnError> {
        self.execute_with_observer(input, &NoObserver).await
    }

    pub async fn execute_with_observer(
        &self,
        input: RunTurnInput,
        observer: &dyn TurnObserver,
    ) -> Result<ChatTurn, RunTurnError> {
        let turn = ChatTurn::new(input.prompt, input.attachments, input.preferences);
        self.execute_turn(turn, input.history, observer).await
    }

    /// Run an already-created turn (still in `framing`).
    pub async fn execute_turn(
        &self,
        mut turn: ChatTurn,
        history: HistorySnapshot,
        observer: &dyn TurnObserver,
    ) -> Result<ChatTurn, RunTurnError> {
        info!("Starting turn {}", turn.id());
        self.logger.log(ConversationEvent::new(
            "turn_started",
            json!({
                "turn_id": turn.id(),
                "prompt": turn.prompt(),
                "attachments": turn.attachments().len(),
                "history_turns": history.len(),
            }),
        ));
        observer.on_stage_change(&turn);
        observer.on_turn_updated(&turn);

        match self.orchestrate(&mut turn, &history, observer).await {
            Ok(()) => {
                info!(
                    "Turn {} complete ({} tokens)",
                    turn.id(),
                    turn.total_tokens()
                );
                self.logger.log(ConversationEvent::new(
                    "turn_complete",
                    json!({ "turn_id": turn.id(), "total_tokens": turn.total_tokens() }),
                ));
                observer.on_complete(&turn);
                Ok(turn)
            }
            Err(cause) => {
                error!("Turn {} failed at {}: {}", turn.id(), turn.stage(), cause);
                if let Err(e) = turn.fail(CRITICAL_FAILURE) {
                    error!("Could not mark turn {} as failed: {}", turn.id(), e);
                }
                self.logger.log(ConversationEvent::new(
                    "turn_failed",
                    json!({ "turn_id": turn.id(), "error": cause.to_string() }),
                ));
                observer.on_stage_change(&turn);
                observer.on_turn_updated(&turn);
                observer.on_error(&turn, CRITICAL_FAILURE);
                Err(RunTurnError::Orchestration {
                    turn_id: turn.id().to_string(),
                    source: cause,
                    turn: Box::new(turn),
                })
            }
        }
    }

    async fn orchestrate(
        &self,
        turn: &mut ChatTurn,
        history: &HistorySnapshot,
        observer: &dyn TurnObserver,
    ) -> Result<(), DomainError> {
        let preferences = turn.preferences().and_then(|p| p.active()).cloned();
        let prompt = turn.prompt().to_string();

        // Stage 1: Framing
        let framing = self.framing.execute(&prompt).await;
        self.logger.log(ConversationEvent::new(
            "framing_detected",
            json!({ "turn_id": turn.id(), "framing": framing }),
        ));
        turn.complete_framing(framing)?;
        publish(turn, observer);

        // Stage 2: Routing
        let decision = self
            .router
            .execute(RouteExpertsInput {
                prompt: &prompt,
                attachments: turn.attachments(),
                history,
                preferences: preferences.as_ref(),
                framing: &framing,
            })
            .await;
        self.logger.log(ConversationEvent::new(
            "experts_selected",
            json!({
                "turn_id": turn.id(),
                "experts": decision.experts.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
                "reasoning": decision.reasoning,
                "fallback": decision.fallback.map(|f| format!("{f:?}")),
            }),
        ));
        observer.on_experts_selected(&decision.experts);
        turn.complete_routing(decision.experts)?;
        publish(turn, observer);

        // Stage 3: Gathering
        let context = Arc::new(WorkerContext {
            prompt: prompt.clone(),
            attachments: turn.attachments().to_vec(),
            history: history.clone(),
            preferences: preferences.clone(),
            framing,
        });
        let pending = turn.worker_results().to_vec();
        let mut update_error = None;
        let results = self
            .workers
            .execute(context, pending, &mut |snapshot: &[WorkerResult]| {
                match turn.update_workers(snapshot.to_vec()) {
                    Ok(()) => {
                        observer.on_worker_update(snapshot);
                        observer.on_turn_updated(turn);
                    }
                    Err(e) => {
                        update_error.get_or_insert(e);
                    }
                }
            })
            .await;
        if let Some(e) = update_error {
            return Err(e);
        }
        for result in &results {
            self.logger.log(ConversationEvent::new(
                "worker_result",
                json!({
                    "turn_id": turn.id(),
                    "expert": result.expert.id,
                    "status": result.status,
                    "content": result.content,
                    "estimated_tokens": result.estimated_tokens,
                    "execution_time_ms": result.execution_time_ms,
                    "media": result.has_media(),
                }),
            ));
        }
        turn.complete_gathering(results)?;
        publish(turn, observer);

        // Stage 4: Judging
        let results = turn.worker_results().to_vec();
        let mut chunk_error = None;
        let judge_tokens = self
            .judge
            .execute(
                JudgeInput {
                    prompt: &prompt,
                    results: &results,
                    history,
                    preferences: preferences.as_ref(),
                    framing: &framing,
                },
                &mut |chunk: &str| match turn.append_synthesis(chunk) {
                    Ok(()) => {
                        observer.on_synthesis_chunk(chunk);
                        observer.on_turn_updated(turn);
                    }
                    Err(e) => {
                        chunk_error.get_or_insert(e);
                    }
                },
            )
            .await;
        if let Some(e) = chunk_error {
            return Err(e);
        }
        self.logger.log(ConversationEvent::new(
            "synthesis_complete",
            json!({
                "turn_id": turn.id(),
                "content": turn.synthesized(),
                "tokens": judge_tokens,
            }),
        ));
        turn.complete_judging(judge_tokens)?;
        publish(turn, observer);

        // Stage 5: Criticizing
        let audit = self
            .critic
            .execute(CriticInput {
                prompt: &prompt,
                results: &results,
                synthesis: turn.synthesized(),
                framing: &framing,
            })
            .await;
        self.logger.log(ConversationEvent::new(
            "audit_complete",
            json!({ "turn_id": turn.id(), "audit": audit.text, "tokens": audit.tokens }),
        ));
        turn.complete_audit(audit.text, audit.tokens)?;
        publish(turn, observer);

        Ok(())
    }
}

fn publish(turn: &ChatTurn, observer: &dyn TurnObserver) {
    debug!("Turn {} entered {}", turn.id(), turn.stage());
    observer.on_stage_change(turn);
    observer.on_turn_updated(turn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::GatewayError;
    use crate::use_cases::test_support::{CallKind, ScriptedGateway, call_kind};
    use consensus_domain::expert::registry::{FLASH_GENERALIST, IMAGE_EXPERT};
    use consensus_domain::{
        Confidence, ExpertKind, ExpertProfile, GenerateRequest, GenerateResponse, InlineMedia,
        Model, StreamEvent, TurnStage, WorkerStatus, estimate_tokens,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<TurnStage>>,
        experts: Mutex<Vec<String>>,
        worker_updates: Mutex<Vec<Vec<WorkerResult>>>,
        chunks: Mutex<Vec<String>>,
        completed: Mutex<bool>,
        errors: Mutex<Vec<String>>,
    }

    impl TurnObserver for Recorder {
        fn on_stage_change(&self, turn: &ChatTurn) {
            self.stages.lock().unwrap().push(turn.stage());
        }
        fn on_experts_selected(&self, experts: &[ExpertProfile]) {
            *self.experts.lock().unwrap() = experts.iter().map(|e| e.id.clone()).collect();
        }
        fn on_worker_update(&self, results: &[WorkerResult]) {
            self.worker_updates.lock().unwrap().push(results.to_vec());
        }
        fn on_synthesis_chunk(&self, chunk: &str) {
            self.chunks.lock().unwrap().push(chunk.to_string());
        }
        fn on_complete(&self, _turn: &ChatTurn) {
            *self.completed.lock().unwrap() = true;
        }
        fn on_error(&self, _turn: &ChatTurn, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    const FRAMING_JSON: &str = r#"{"domain":"technology","framingIntent":"educational-neutral","correctionTolerance":"medium","authoritySource":"scientific","audienceType":"general-public"}"#;

    fn backend(
        router_reply: &'static str,
    ) -> impl Fn(&GenerateRequest) -> Result<GenerateResponse, GatewayError> + Send + Sync + 'static
    {
        move |request| match call_kind(request) {
            CallKind::Framing => Ok(GenerateResponse::from_text(FRAMING_JSON)),
            CallKind::Router => Ok(GenerateResponse::from_text(router_reply)),
            CallKind::Critic => Ok(GenerateResponse::from_text("Solid answer.")),
            CallKind::Judge => Ok(GenerateResponse::from_text("Confidence: High\nDone")),
            CallKind::Worker => match request.model {
                Model::Gemini25FlashImage => Ok(GenerateResponse::default().with_media(
                    InlineMedia {
                        mime_type: "image/png".into(),
                        data: "cmVkIGJpa2U=".into(),
                    },
                )),
                Model::Gemini3Pro => Err(GatewayError::RateLimited(
                    "RESOURCE_EXHAUSTED: model overloaded".into(),
                )),
                _ => Ok(GenerateResponse::from_text("A bicycle, drawn.")),
            },
        }
    }

    fn use_case(gateway: Arc<ScriptedGateway>) -> RunTurnUseCase<ScriptedGateway> {
        RunTurnUseCase::new(
            gateway,
            Arc::new(ExpertRegistry::builtin()),
            &PipelineConfig::immediate(),
        )
    }

    #[tokio::test]
    async fn test_image_request_runs_all_stages() {
        let gateway = Arc::new(
            ScriptedGateway::new(backend(r#"{"selectedIds":["gemini-image"],"reasoning":"draw"}"#))
                .with_stream(vec![
                    StreamEvent::Delta("Confidence: High\n".into()),
                    StreamEvent::Delta("Here is your red bicycle.".into()),
                    StreamEvent::Completed(String::new()),
                ]),
        );
        let recorder = Recorder::default();
        let turn = use_case(Arc::clone(&gateway))
            .execute_with_observer(RunTurnInput::new("Draw a red bicycle"), &recorder)
            .await
            .unwrap();

        assert_eq!(
            *recorder.stages.lock().unwrap(),
            vec![
                TurnStage::Framing,
                TurnStage::Routing,
                TurnStage::Gathering,
                TurnStage::Judging,
                TurnStage::Criticizing,
                TurnStage::Complete,
            ]
        );
        assert_eq!(*recorder.experts.lock().unwrap(), vec![IMAGE_EXPERT, FLASH_GENERALIST]);
        assert!(*recorder.completed.lock().unwrap());

        assert_eq!(turn.stage(), TurnStage::Complete);
        let image = &turn.worker_results()[0];
        assert!(image.is_success());
        assert_eq!(image.content, "Image generated.");
        assert_eq!(image.images, vec!["cmVkIGJpa2U=".to_string()]);
        assert!(turn.worker_results()[1].is_success());

        let (confidence, text) = turn.confidence();
        assert_eq!(confidence, Some(Confidence::High));
        assert_eq!(text, "Here is your red bicycle.");
        assert_eq!(turn.audit(), Some("Solid answer."));

        let expected = 250
            + estimate_tokens("A bicycle, drawn.")
            + estimate_tokens("Confidence: High\nHere is your red bicycle.")
            + estimate_tokens("Solid answer.");
        assert_eq!(turn.total_tokens(), expected);

        let judge_text = gateway.calls_of(CallKind::Judge)[0].text();
        assert!(judge_text.contains("shown in this expert's result panel"));
    }

    #[tokio::test]
    async fn test_partial_failure_still_completes() {
        let gateway = Arc::new(ScriptedGateway::new(backend(
            r#"{"selectedIds":["architect","flash-generalist","action-agent"]}"#,
        )));
        // architect runs on the Pro model, which stays rate-limited
        let recorder = Recorder::default();
        let turn = use_case(Arc::clone(&gateway))
            .execute_with_observer(RunTurnInput::new("Design a cache"), &recorder)
            .await
            .unwrap();

        assert_eq!(turn.stage(), TurnStage::Complete);
        let statuses: Vec<_> = turn.worker_results().iter().map(|r| r.is_success()).collect();
        assert_eq!(statuses, vec![false, true, true]);
        let failed = &turn.worker_results()[0];
        assert_eq!(failed.expert.id, "architect");
        assert_eq!(failed.status, WorkerStatus::Error);
        assert!(failed.content.contains("model overloaded"));
        let pro_worker_calls = gateway
            .calls_of(CallKind::Worker)
            .iter()
            .filter(|r| r.model == Model::Gemini3Pro)
            .count();
        assert_eq!(pro_worker_calls, 5);

        let updates = recorder.worker_updates.lock().unwrap();
        assert_eq!(updates.len(), 3);
        assert!(updates.iter().all(|u| u.len() == 3));

        let judge_text = gateway.calls_of(CallKind::Judge)[0].text();
        assert!(!judge_text.contains("model overloaded"));
        assert_eq!(judge_text.matches("A bicycle, drawn.").count(), 2);
    }

    #[tokio::test]
    async fn test_all_workers_failing_yields_no_valid_responses() {
        let gateway = Arc::new(ScriptedGateway::new(|request| match call_kind(request) {
            CallKind::Worker => Err(GatewayError::RequestFailed("down".into())),
            CallKind::Critic => Ok(GenerateResponse::from_text("")),
            _ => Ok(GenerateResponse::from_text("garbage")),
        }));
        let turn = use_case(Arc::clone(&gateway))
            .execute(RunTurnInput::new("anything"))
            .await
            .unwrap();

        assert_eq!(turn.stage(), TurnStage::Complete);
        assert!(turn.synthesized().contains("no valid responses"));
        assert!(gateway.calls_of(CallKind::Judge).is_empty());
        assert_eq!(turn.audit(), Some("No audit notes recorded."));
    }

    #[tokio::test]
    async fn test_preferences_reach_workers_only_when_memory_enabled() {
        let gateway = Arc::new(ScriptedGateway::new(backend(r#"{"selectedIds":["flash-generalist"]}"#)));
        let mut prefs = UserPreferences::default();
        use_case(Arc::clone(&gateway))
            .execute(RunTurnInput::new("hi").with_preferences(prefs.clone()))
            .await
            .unwrap();
        assert!(gateway.calls_of(CallKind::Worker)[0].text().contains("[CONTEXT: Act as"));

        let quiet = Arc::new(ScriptedGateway::new(backend(r#"{"selectedIds":["flash-generalist"]}"#)));
        prefs.memory_enabled = false;
        let turn = use_case(Arc::clone(&quiet))
            .execute(RunTurnInput::new("hi").with_preferences(prefs))
            .await
            .unwrap();
        assert!(!quiet.calls_of(CallKind::Worker)[0].text().contains("[CONTEXT:"));
        assert!(turn.preferences().is_some());
    }

    #[tokio::test]
    async fn test_invariant_violation_drives_turn_to_error() {
        // a registry without generalists has no routing fallback
        let registry = ExpertRegistry::new(vec![ExpertProfile::new(
            "solo",
            "Solo",
            ExpertKind::Text,
            Model::Gemini3Flash,
        )]);
        let gateway = Arc::new(ScriptedGateway::new(|_| Ok(GenerateResponse::from_text("??"))));
        let use_case = RunTurnUseCase::new(gateway, Arc::new(registry), &PipelineConfig::immediate());
        let recorder = Recorder::default();

        let err = use_case
            .execute_with_observer(RunTurnInput::new("hi"), &recorder)
            .await
            .unwrap_err();

        let RunTurnError::Orchestration { source, .. } = &err;
        assert_eq!(*source, DomainError::NoExpertsSelected);
        assert_eq!(err.turn().stage(), TurnStage::Error);
        assert_eq!(err.turn().error(), Some(CRITICAL_FAILURE));
        assert_eq!(*recorder.errors.lock().unwrap(), vec![CRITICAL_FAILURE]);
        assert_eq!(recorder.stages.lock().unwrap().last(), Some(&TurnStage::Error));
        assert!(!*recorder.completed.lock().unwrap());
    }
}
