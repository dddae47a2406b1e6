//! Detect Framing use case
//!
//! One JSON-only call classifying the cultural/epistemic stance of a
//! prompt. Every failure degrades to the default profile.

use crate::config::PipelineConfig;
use crate::ports::llm_gateway::LlmGateway;
use consensus_domain::{FramingProfile, GenerateRequest, Model, PromptTemplate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct DetectFramingUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    model: Model,
    timeout: Duration,
}

impl<G: LlmGateway + 'static> DetectFramingUseCase<G> {
    pub fn new(gateway: Arc<G>, config: &PipelineConfig) -> Self {
        Self {
            gateway,
            model: config.framing_model.clone(),
            timeout: config.framing_timeout,
        }
    }

    /// Classify `prompt`; never fails.
    pub async fn execute(&self, prompt: &str) -> FramingProfile {
        let request = GenerateRequest::new(self.model.clone())
            .with_system(PromptTemplate::framing_system())
            .with_text(PromptTemplate::framing_user(prompt))
            .json();

        let reply = match tokio::time::timeout(self.timeout, self.gateway.generate(&request)).await
        {
            Ok(Ok(response)) => response.text,
            Ok(Err(e)) => {
                warn!("Framing detection failed, using default profile: {}", e);
                return FramingProfile::default();
            }
            Err(_) => {
                warn!(
                    "Framing detection timed out after {:?}, using default profile",
                    self.timeout
                );
                return FramingProfile::default();
            }
        };

        match FramingProfile::parse(&reply) {
            Some(profile) => {
                debug!("Detected framing: {}", profile.to_json());
                profile
            }
            None => {
                warn!("Unusable framing reply, using default profile");
                FramingProfile::default()
            }
        }
    }
}
