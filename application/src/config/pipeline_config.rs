//! Pipeline parameters — timing, limits and model choices per stage.

use super::retry_policy::RetryPolicy;
use consensus_domain::Model;
use std::time::Duration;

/// Static parameters controlling one turn.
///
/// Built once from file/env configuration and shared by every use case.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Upper bound on the framing classifier call
    pub framing_timeout: Duration,
    /// Delay between consecutive worker launches
    pub stagger_interval: Duration,
    /// Poll period for long-running media jobs
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    /// Cap on the router's selection
    pub max_experts: usize,
    /// Completed turns handed to the next turn as history
    pub history_window: usize,
    pub judge_thinking_budget: u32,
    /// Route every turn to a single generalist
    pub degraded: bool,
    pub framing_model: Model,
    pub router_model: Model,
    pub judge_model: Model,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            framing_timeout: Duration::from_secs(20),
            stagger_interval: Duration::from_millis(1500),
            poll_interval: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            max_experts: 4,
            history_window: 3,
            judge_thinking_budget: 2048,
            degraded: false,
            framing_model: Model::fast(),
            router_model: Model::fast(),
            judge_model: Model::deep(),
        }
    }
}

impl PipelineConfig {
    // ==================== Builder Methods ====================

    pub fn with_framing_timeout(mut self, timeout: Duration) -> Self {
        self.framing_timeout = timeout;
        self
    }

    pub fn with_stagger_interval(mut self, interval: Duration) -> Self {
        self.stagger_interval = interval;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_experts(mut self, max: usize) -> Self {
        self.max_experts = max.max(1);
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_judge_thinking_budget(mut self, budget: u32) -> Self {
        self.judge_thinking_budget = budget;
        self
    }

    pub fn degraded(mut self, degraded: bool) -> Self {
        self.degraded = degraded;
        self
    }

    pub fn with_judge_model(mut self, model: Model) -> Self {
        self.judge_model = model;
        self
    }

    pub fn with_fast_model(mut self, model: Model) -> Self {
        self.framing_model = model.clone();
        self.router_model = model;
        self
    }

    /// Zero delays everywhere, for tests
    pub fn immediate() -> Self {
        Self::default()
            .with_stagger_interval(Duration::ZERO)
            .with_poll_interval(Duration::ZERO)
            .with_retry(RetryPolicy::new(5, Duration::ZERO))
    }
}
