//! Raw TOML configuration data types
//!
//! These structs mirror the config file one section per file. Everything is
//! optional in TOML; `#[serde(default)]` fills the gaps.

mod backend;
mod logging;
mod models;
mod output;
mod pipeline;
mod repl;
mod storage;

pub use backend::FileBackendConfig;
pub use logging::FileLoggingConfig;
pub use models::FileModelsConfig;
pub use output::FileOutputConfig;
pub use pipeline::FilePipelineConfig;
pub use repl::FileReplConfig;
pub use storage::{FileStorageConfig, expand_home};

use crate::gemini::GeminiSettings;
use consensus_application::PipelineConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    ZeroValue(&'static str),

    #[error("models.{0}: model name cannot be empty")]
    EmptyModelName(&'static str),

    #[error("backend.base_url must start with http:// or https:// (got '{0}')")]
    InvalidBaseUrl(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Backend endpoint and credentials
    pub backend: FileBackendConfig,
    /// Pipeline timing, retry and routing limits
    pub pipeline: FilePipelineConfig,
    /// Models for the structured calls and the judge
    pub models: FileModelsConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// REPL settings
    pub repl: FileReplConfig,
    /// Log file and transcript settings
    pub logging: FileLoggingConfig,
    /// Session and preference storage
    pub storage: FileStorageConfig,
}

impl FileConfig {
    /// Check values that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.backend.validate()?;
        self.pipeline.validate()?;
        self.models.validate()?;
        Ok(())
    }

    pub fn to_pipeline_config(&self) -> PipelineConfig {
        let config = self.pipeline.to_pipeline_config();
        self.models.apply(config)
    }

    /// Backend settings with the API key falling back to the environment
    pub fn to_gemini_settings(&self) -> GeminiSettings {
        self.backend.to_settings().with_env_fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_domain::{Model, OutputFormat};
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[backend]
api_key = "abc"
video_enabled = true

[pipeline]
max_experts = 3
stagger_ms = 500
degraded = true

[models]
judge = "gemini-2.5-pro"

[output]
format = "full"
color = false

[repl]
show_progress = false
history_file = "~/.local/share/consensus-engine/history.txt"

[logging]
log_dir = "/tmp/consensus-logs"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.api_key.as_deref(), Some("abc"));
        assert!(config.backend.video_enabled);
        assert_eq!(config.output.format, Some(OutputFormat::Full));
        assert!(!config.output.color);
        assert!(!config.repl.show_progress);
        assert_eq!(config.logging.log_dir.as_deref(), Some("/tmp/consensus-logs"));

        let pipeline = config.to_pipeline_config();
        assert_eq!(pipeline.max_experts, 3);
        assert_eq!(pipeline.stagger_interval, Duration::from_millis(500));
        assert!(pipeline.degraded);
        assert_eq!(pipeline.judge_model, Model::Custom("gemini-2.5-pro".to_string()));
        assert_eq!(pipeline.framing_model, Model::Gemini3Flash);
    }

    #[test]
    fn test_default_config_matches_pipeline_defaults() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.to_pipeline_config(), PipelineConfig::default());
        assert!(config.output.color);
        assert!(config.repl.show_progress);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config: FileConfig = toml::from_str("[pipeline]\nmax_experts = 0\n").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroValue("pipeline.max_experts"))
        );

        let config: FileConfig = toml::from_str("[models]\nfast = \" \"\n").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::EmptyModelName("fast"))
        );
    }
}
