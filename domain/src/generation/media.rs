//! Long-running media generation jobs (video)

use crate::core::model::Model;

/// Submission parameters for a video job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaJobRequest {
    pub model: Model,
    pub prompt: String,
    pub resolution: String,
    pub aspect_ratio: String,
}

impl MediaJobRequest {
    /// One 1080p 16:9 clip
    pub fn video(model: Model, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            resolution: "1080p".to_string(),
            aspect_ratio: "16:9".to_string(),
        }
    }
}

/// Handle to a submitted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaJob {
    /// Backend operation name used for polling
    pub name: String,
}

impl MediaJob {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaJobStatus {
    Running,
    /// Finished; the reference is absent when the backend returned no video
    Done { video_uri: Option<String> },
}

impl MediaJobStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, MediaJobStatus::Done { .. })
    }
}
