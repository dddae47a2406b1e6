//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for the rolling log file and turn transcripts
    pub log_dir: Option<String>,
    /// Write a JSONL transcript per run when `log_dir` is set
    pub transcript: bool,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            transcript: true,
        }
    }
}
