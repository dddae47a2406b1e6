//! Application-level configuration.
//!
//! - [`PipelineConfig`] — per-turn timing, limits and stage models
//! - [`RetryPolicy`] — backoff for rate-limited calls

pub mod pipeline_config;
pub mod retry_policy;

pub use pipeline_config::PipelineConfig;
pub use retry_policy::RetryPolicy;
