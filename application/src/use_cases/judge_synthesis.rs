//! Judge Synthesis use case
//!
//! Streams one synthesized answer from the successful worker outputs.
//! Transport failures never escape: they become a single visible fragment
//! at the end of whatever was already streamed.

use crate::config::PipelineConfig;
use crate::ports::llm_gateway::LlmGateway;
use consensus_domain::{
    FramingProfile, GenerateRequest, HistorySnapshot, Model, PromptTemplate, StreamEvent,
    UserPreferences, WorkerResult, estimate_tokens,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Appended to the stream when synthesis breaks off
pub const SYNTHESIS_ERROR: &str = "Synthesis Error. Please retry.";

/// Emitted instead of a backend call when every worker failed
pub const NO_VALID_RESPONSES: &str =
    "Confidence: Low\n\nAll experts failed, so there are no valid responses to synthesize. Please retry.";

pub struct JudgeInput<'a> {
    pub prompt: &'a str,
    pub results: &'a [WorkerResult],
    pub history: &'a HistorySnapshot,
    pub preferences: Option<&'a UserPreferences>,
    pub framing: &'a FramingProfile,
}

pub struct JudgeSynthesisUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    model: Model,
    thinking_budget: u32,
}

impl<G: LlmGateway + 'static> JudgeSynthesisUseCase<G> {
    pub fn new(gateway: Arc<G>, config: &PipelineConfig) -> Self {
        Self {
            gateway,
            model: config.judge_model.clone(),
            thinking_budget: config.judge_thinking_budget,
        }
    }

    /// Stream the synthesis into `on_chunk`; returns its token estimate.
    pub async fn execute(
        &self,
        input: JudgeInput<'_>,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> u32 {
        let successes = input.results.iter().filter(|r| r.is_success()).count();
        if successes == 0 {
            warn!("No successful workers; skipping synthesis call");
            on_chunk(NO_VALID_RESPONSES);
            return 0;
        }
        debug!("Synthesizing from {} successful workers", successes);

        let request = GenerateRequest::new(self.model.clone())
            .with_system(PromptTemplate::judge_system(input.framing, input.preferences))
            .with_text(PromptTemplate::judge_user(
                input.prompt,
                input.results,
                input.history,
            ))
            .with_thinking_budget(self.thinking_budget);

        let mut streamed = String::new();
        let mut handle = match self.gateway.generate_stream(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Synthesis stream failed to open: {}", e);
                on_chunk(SYNTHESIS_ERROR);
                return 0;
            }
        };

        while let Some(event) = handle.next().await {
            match event {
                StreamEvent::Delta(chunk) => {
                    if !chunk.is_empty() {
                        on_chunk(&chunk);
                        streamed.push_str(&chunk);
                    }
                }
                StreamEvent::Completed(text) => {
                    // Non-streaming backends deliver everything here
                    if streamed.is_empty() && !text.is_empty() {
                        on_chunk(&text);
                        streamed = text;
                    }
                    break;
                }
                StreamEvent::Error(e) => {
                    warn!("Synthesis stream broke off: {}", e);
                    if streamed.is_empty() {
                        on_chunk(SYNTHESIS_ERROR);
                    } else {
                        on_chunk(&format!("\n\n{SYNTHESIS_ERROR}"));
                    }
                    break;
                }
            }
        }

        estimate_tokens(&streamed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::GatewayError;
    use crate::use_cases::test_support::{CallKind, ScriptedGateway};
    use consensus_domain::{
        CorrectionTolerance, ExpertKind, ExpertProfile, GenerateResponse, WorkerOutcome,
        WorkerOutput,
    };

    fn results(successes: usize, failures: usize) -> Vec<WorkerResult> {
        let mut out = Vec::new();
        for i in 0..successes + failures {
            let expert = ExpertProfile::new(
                format!("e{i}"),
                format!("Expert {i}"),
                ExpertKind::Text,
                Model::Gemini3Flash,
            );
            let mut result = WorkerResult::pending(expert);
            let outcome = if i < successes {
                WorkerOutcome::Success(WorkerOutput::text(format!("view {i}"), 2))
            } else {
                WorkerOutcome::failure("quota exhausted")
            };
            result.resolve(outcome).unwrap();
            out.push(result);
        }
        out
    }

    async fn judge(
        gateway: Arc<ScriptedGateway>,
        results: &[WorkerResult],
        framing: &FramingProfile,
    ) -> (Vec<String>, u32) {
        let use_case = JudgeSynthesisUseCase::new(gateway, &PipelineConfig::immediate());
        let mut chunks = Vec::new();
        let tokens = use_case
            .execute(
                JudgeInput {
                    prompt: "What is Rust?",
                    results,
                    history: &HistorySnapshot::default(),
                    preferences: None,
                    framing,
                },
                &mut |c: &str| chunks.push(c.to_string()),
            )
            .await;
        (chunks, tokens)
    }

    #[tokio::test]
    async fn test_zero_successes_skip_backend() {
        let gateway = Arc::new(ScriptedGateway::new(|_| unreachable!("no call expected")));
        let (chunks, tokens) =
            judge(Arc::clone(&gateway), &results(0, 3), &FramingProfile::default()).await;

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("no valid responses"));
        assert_eq!(tokens, 0);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_streams_fragments_in_order() {
        let gateway = Arc::new(
            ScriptedGateway::new(|_| Ok(GenerateResponse::default())).with_stream(vec![
                StreamEvent::Delta("Confidence: High\n".into()),
                StreamEvent::Delta("Rust is ".into()),
                StreamEvent::Delta("a language.".into()),
                StreamEvent::Completed("ignored".into()),
            ]),
        );
        let (chunks, tokens) =
            judge(Arc::clone(&gateway), &results(2, 1), &FramingProfile::default()).await;

        assert_eq!(chunks, vec!["Confidence: High\n", "Rust is ", "a language."]);
        assert_eq!(tokens, estimate_tokens("Confidence: High\nRust is a language."));

        let call = &gateway.calls_of(CallKind::Judge)[0];
        assert_eq!(call.thinking_budget, Some(2048));
        let text = call.text();
        assert!(text.contains("[Expert 0]: view 0"));
        assert!(text.contains("[Expert 1]: view 1"));
        assert!(!text.contains("quota exhausted"));
    }

    #[tokio::test]
    async fn test_completed_only_stream_is_forwarded() {
        let gateway = Arc::new(ScriptedGateway::new(|_| {
            Ok(GenerateResponse::from_text("Confidence: Medium\nAnswer"))
        }));
        let (chunks, _) = judge(gateway, &results(1, 0), &FramingProfile::default()).await;
        assert_eq!(chunks, vec!["Confidence: Medium\nAnswer"]);
    }

    #[tokio::test]
    async fn test_mid_stream_error_appends_one_fragment() {
        let gateway = Arc::new(
            ScriptedGateway::new(|_| Ok(GenerateResponse::default())).with_stream(vec![
                StreamEvent::Delta("Confidence: High\nPartial".into()),
                StreamEvent::Error("connection reset".into()),
                StreamEvent::Delta("never seen".into()),
            ]),
        );
        let (chunks, tokens) = judge(gateway, &results(1, 0), &FramingProfile::default()).await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "Confidence: High\nPartial");
        assert_eq!(chunks[1], format!("\n\n{SYNTHESIS_ERROR}"));
        assert_eq!(chunks.iter().filter(|c| c.contains(SYNTHESIS_ERROR)).count(), 1);
        assert_eq!(tokens, estimate_tokens("Confidence: High\nPartial"));
    }

    #[tokio::test]
    async fn test_open_failure_emits_error_fragment() {
        let gateway = Arc::new(
            ScriptedGateway::new(|_| Ok(GenerateResponse::default()))
                .with_stream_open_error(GatewayError::ConnectionError("refused".into())),
        );
        let (chunks, tokens) = judge(gateway, &results(1, 0), &FramingProfile::default()).await;
        assert_eq!(chunks, vec![SYNTHESIS_ERROR]);
        assert_eq!(tokens, 0);
    }

    #[tokio::test]
    async fn test_low_tolerance_requests_additive_layer() {
        let gateway = Arc::new(ScriptedGateway::new(|_| {
            Ok(GenerateResponse::from_text("Confidence: High\nok"))
        }));
        let mut framing = FramingProfile::default();
        framing.correction_tolerance = CorrectionTolerance::Low;
        judge(Arc::clone(&gateway), &results(1, 0), &framing).await;

        let call = &gateway.calls_of(CallKind::Judge)[0];
        assert!(
            call.system_instruction
                .as_deref()
                .unwrap()
                .contains("additive secondary layer")
        );
    }
}
