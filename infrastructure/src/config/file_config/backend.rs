//! Backend configuration from TOML (`[backend]` section)

use super::ConfigValidationError;
use crate::gemini::GeminiSettings;
use crate::gemini::client::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw backend configuration
///
/// # Example
///
/// ```toml
/// [backend]
/// api_key = "..."          # otherwise GEMINI_API_KEY or API_KEY
/// video_api_key = "..."    # paid key for video generation
/// video_enabled = false    # allow video with the main key
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    pub api_key: Option<String>,
    pub video_api_key: Option<String>,
    pub video_enabled: bool,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            video_api_key: None,
            video_enabled: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl FileBackendConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigValidationError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroValue("backend.request_timeout_secs"));
        }
        Ok(())
    }

    pub(super) fn to_settings(&self) -> GeminiSettings {
        GeminiSettings {
            base_url: self.base_url.clone(),
            api_key: non_blank(&self.api_key),
            video_api_key: non_blank(&self.video_api_key),
            video_enabled: self.video_enabled,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
