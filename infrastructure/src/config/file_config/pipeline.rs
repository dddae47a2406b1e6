//! Pipeline configuration from TOML (`[pipeline]` section)

use super::ConfigValidationError;
use consensus_application::{PipelineConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Framing classifier timeout
    pub framing_timeout_secs: u64,
    /// Delay between worker launches
    pub stagger_ms: u64,
    /// Video job poll interval
    pub poll_interval_secs: u64,
    /// Total attempts per rate-limited call
    pub max_attempts: u32,
    /// First backoff step; doubles per retry
    pub retry_base_ms: u64,
    pub max_experts: usize,
    /// Completed turns sent along as history
    pub history_window: usize,
    pub judge_thinking_budget: u32,
    /// Route every turn to a single generalist
    pub degraded: bool,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let defaults = PipelineConfig::default();
        Self {
            framing_timeout_secs: defaults.framing_timeout.as_secs(),
            stagger_ms: defaults.stagger_interval.as_millis() as u64,
            poll_interval_secs: defaults.poll_interval.as_secs(),
            max_attempts: defaults.retry.max_attempts,
            retry_base_ms: defaults.retry.base_delay.as_millis() as u64,
            max_experts: defaults.max_experts,
            history_window: defaults.history_window,
            judge_thinking_budget: defaults.judge_thinking_budget,
            degraded: defaults.degraded,
        }
    }
}

impl FilePipelineConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigValidationError> {
        let checks = [
            (self.framing_timeout_secs == 0, "pipeline.framing_timeout_secs"),
            (self.poll_interval_secs == 0, "pipeline.poll_interval_secs"),
            (self.max_attempts == 0, "pipeline.max_attempts"),
            (self.max_experts == 0, "pipeline.max_experts"),
        ];
        match checks.iter().find(|(zero, _)| *zero) {
            Some((_, field)) => Err(ConfigValidationError::ZeroValue(*field)),
            None => Ok(()),
        }
    }

    pub(super) fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_framing_timeout(Duration::from_secs(self.framing_timeout_secs))
            .with_stagger_interval(Duration::from_millis(self.stagger_ms))
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs))
            .with_retry(RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.retry_base_ms),
            ))
            .with_max_experts(self.max_experts)
            .with_history_window(self.history_window)
            .with_judge_thinking_budget(self.judge_thinking_budget)
            .degraded(self.degraded)
    }
}
