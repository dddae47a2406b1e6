//! Critic Audit use case
//!
//! Post-hoc review of the synthesized answer by the registry's critic
//! expert. Always yields some text.

use crate::ports::llm_gateway::LlmGateway;
use consensus_domain::{
    ExpertRegistry, FramingProfile, GenerateRequest, PromptTemplate, WorkerResult,
    estimate_tokens,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub const AUDITOR_UNAVAILABLE: &str = "Auditor unavailable.";
pub const NO_AUDIT_NOTES: &str = "No audit notes recorded.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audit {
    pub text: String,
    pub tokens: u32,
}

impl Audit {
    fn unavailable() -> Self {
        Self {
            text: AUDITOR_UNAVAILABLE.to_string(),
            tokens: 0,
        }
    }
}

pub struct CriticInput<'a> {
    pub prompt: &'a str,
    pub results: &'a [WorkerResult],
    pub synthesis: &'a str,
    pub framing: &'a FramingProfile,
}

pub struct CriticAuditUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    registry: Arc<ExpertRegistry>,
}

impl<G: LlmGateway + 'static> CriticAuditUseCase<G> {
    pub fn new(gateway: Arc<G>, registry: Arc<ExpertRegistry>) -> Self {
        Self { gateway, registry }
    }

    pub async fn execute(&self, input: CriticInput<'_>) -> Audit {
        let Some(critic) = self.registry.critic() else {
            warn!("No critic expert registered");
            return Audit::unavailable();
        };

        let request = GenerateRequest::new(critic.model.clone())
            .with_system(PromptTemplate::critic_system(input.framing, critic))
            .with_text(PromptTemplate::critic_user(
                input.prompt,
                input.results,
                input.synthesis,
            ));

        match self.gateway.generate(&request).await {
            Ok(response) => {
                let text = if response.text.trim().is_empty() {
                    NO_AUDIT_NOTES.to_string()
                } else {
                    response.text
                };
                debug!("Audit: {} chars", text.len());
                let tokens = estimate_tokens(&text);
                Audit { text, tokens }
            }
            Err(e) => {
                warn!("Critic call failed: {}", e);
                Audit::unavailable()
            }
        }
    }
}
