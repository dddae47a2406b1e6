//! Model configuration from TOML (`[models]` section)

use super::ConfigValidationError;
use consensus_application::PipelineConfig;
use consensus_domain::Model;
use serde::{Deserialize, Serialize};

/// Role-based model overrides
///
/// ```toml
/// [models]
/// fast = "gemini-3-flash-preview"   # framing + routing
/// judge = "gemini-3-pro-preview"    # synthesis
/// ```
///
/// Expert models come from the built-in catalog and are not configurable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    pub fast: Option<String>,
    pub judge: Option<String>,
}

impl FileModelsConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [("fast", &self.fast), ("judge", &self.judge)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigValidationError::EmptyModelName(field));
            }
        }
        Ok(())
    }

    pub(super) fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(fast) = &self.fast {
            config = config.with_fast_model(Model::from(fast.trim()));
        }
        if let Some(judge) = &self.judge {
            config = config.with_judge_model(Model::from(judge.trim()));
        }
        config
    }
}
