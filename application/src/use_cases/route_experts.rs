//! Route Experts use case
//!
//! Picks the experts for a turn. The backend proposes ids; the final list
//! is always produced by deterministic client-side rules, so routing never
//! fails and never returns an empty selection while the registry has a
//! generalist.

use crate::config::PipelineConfig;
use crate::ports::llm_gateway::LlmGateway;
use consensus_domain::expert::registry::FLASH_GENERALIST;
use consensus_domain::{
    ExpertKind, ExpertProfile, ExpertRegistry, FileAttachment, FramingProfile, GenerateRequest,
    HistorySnapshot, Model, PromptTemplate, UserPreferences, extract_json_object,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything the router looks at
pub struct RouteExpertsInput<'a> {
    pub prompt: &'a str,
    pub attachments: &'a [FileAttachment],
    pub history: &'a HistorySnapshot,
    pub preferences: Option<&'a UserPreferences>,
    pub framing: &'a FramingProfile,
}

/// Why the backend's proposal was not used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingFallback {
    /// Pipeline configured for degraded mode; no router call made
    Degraded,
    /// Router call itself was rate-limited
    RateLimited,
    /// Call failed, reply malformed, or nothing usable selected
    Unusable,
}

#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub experts: Vec<ExpertProfile>,
    pub reasoning: Option<String>,
    pub fallback: Option<RoutingFallback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RouterReply {
    selected_ids: Vec<String>,
    reasoning: Option<String>,
}

pub struct RouteExpertsUseCase<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    registry: Arc<ExpertRegistry>,
    model: Model,
    max_experts: usize,
    degraded: bool,
}

impl<G: LlmGateway + 'static> RouteExpertsUseCase<G> {
    pub fn new(gateway: Arc<G>, registry: Arc<ExpertRegistry>, config: &PipelineConfig) -> Self {
        Self {
            gateway,
            registry,
            model: config.router_model.clone(),
            max_experts: config.max_experts,
            degraded: config.degraded,
        }
    }

    pub async fn execute(&self, input: RouteExpertsInput<'_>) -> RoutingDecision {
        if self.degraded {
            info!("Degraded mode: routing to a single generalist");
            return self.fallback(RoutingFallback::Degraded, None);
        }

        let request = GenerateRequest::new(self.model.clone())
            .with_text(PromptTemplate::router_prompt(
                input.prompt,
                input.attachments.len(),
                input.history,
                input.preferences,
                input.framing,
                self.registry.routable(),
                self.max_experts,
            ))
            .json();

        let reply = match self.gateway.generate(&request).await {
            Ok(response) => response.text,
            Err(e) if e.is_rate_limited() => {
                warn!("Router rate-limited, using single generalist: {}", e);
                return self.fallback(RoutingFallback::RateLimited, None);
            }
            Err(e) => {
                warn!("Router call failed, using default experts: {}", e);
                return self.fallback(RoutingFallback::Unusable, None);
            }
        };

        let Some(parsed) = extract_json_object(&reply)
            .and_then(|json| serde_json::from_str::<RouterReply>(json).ok())
        else {
            warn!("Malformed router reply, using default experts");
            return self.fallback(RoutingFallback::Unusable, None);
        };

        let experts = select_experts(&self.registry, &parsed.selected_ids, self.max_experts);
        if experts.is_empty() {
            warn!("Router selected no known experts, using default experts");
            return self.fallback(RoutingFallback::Unusable, parsed.reasoning);
        }

        debug!(
            "Router selected {:?} ({})",
            experts.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            parsed.reasoning.as_deref().unwrap_or("no reasoning")
        );
        RoutingDecision {
            experts,
            reasoning: parsed.reasoning,
            fallback: None,
        }
    }

    fn fallback(&self, reason: RoutingFallback, reasoning: Option<String>) -> RoutingDecision {
        let experts = match reason {
            RoutingFallback::Degraded | RoutingFallback::RateLimited => {
                self.registry.degraded_selection()
            }
            RoutingFallback::Unusable => self.registry.default_selection(),
        };
        RoutingDecision {
            experts,
            reasoning,
            fallback: Some(reason),
        }
    }
}

/// Turn proposed ids into the final ordered selection.
///
/// Unknown ids and critics are dropped, duplicates keep their first
/// position, the list is capped at `max`, and a generalist is appended
/// when none was chosen and there is room.
pub fn select_experts(registry: &ExpertRegistry, ids: &[String], max: usize) -> Vec<ExpertProfile> {
    let mut selected: Vec<ExpertProfile> = Vec::new();
    for id in ids {
        let Some(expert) = registry.get(id.trim()) else {
            debug!("Router proposed unknown expert '{}'", id);
            continue;
        };
        if expert.kind == ExpertKind::Critic || selected.iter().any(|e| e.id == expert.id) {
            continue;
        }
        if selected.len() == max {
            break;
        }
        selected.push(expert.clone());
    }

    if !selected.is_empty()
        && selected.len() < max
        && !selected.iter().any(|e| e.generalist)
        && let Some(generalist) = registry
            .get(FLASH_GENERALIST)
            .or_else(|| registry.generalists().next())
    {
        selected.push(generalist.clone());
    }
    selected
}
