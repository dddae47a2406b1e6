//! Worker results

use crate::consensus::action::ActionDraft;
use crate::core::error::DomainError;
use crate::expert::entities::ExpertProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Pending,
    Success,
    Error,
}

/// A grounding source returned by a search-augmented expert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingCitation {
    #[serde(default)]
    pub title: String,
    pub uri: String,
}

impl GroundingCitation {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }

    /// Title when present, otherwise the URI
    pub fn label(&self) -> &str {
        if self.title.is_empty() {
            &self.uri
        } else {
            &self.title
        }
    }
}

/// Payload of a successful expert call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerOutput {
    pub content: String,
    /// Base64-encoded images
    pub images: Vec<String>,
    pub video_uri: Option<String>,
    pub execution_time_ms: Option<u64>,
    pub estimated_tokens: u32,
    pub citations: Vec<GroundingCitation>,
    pub action_draft: Option<ActionDraft>,
}

impl WorkerOutput {
    pub fn text(content: impl Into<String>, estimated_tokens: u32) -> Self {
        Self {
            content: content.into(),
            estimated_tokens,
            ..Default::default()
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_video_uri(mut self, uri: Option<String>) -> Self {
        self.video_uri = uri;
        self
    }

    pub fn with_execution_time_ms(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }

    pub fn with_citations(mut self, citations: Vec<GroundingCitation>) -> Self {
        self.citations = citations;
        self
    }

    pub fn with_action_draft(mut self, draft: Option<ActionDraft>) -> Self {
        self.action_draft = draft;
        self
    }
}

/// How a worker settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Success(WorkerOutput),
    Failure {
        message: String,
        /// The expert cannot run until a credential is configured
        requires_configuration: bool,
    },
}

impl WorkerOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        WorkerOutcome::Failure {
            message: message.into(),
            requires_configuration: false,
        }
    }

    pub fn needs_configuration(message: impl Into<String>) -> Self {
        WorkerOutcome::Failure {
            message: message.into(),
            requires_configuration: true,
        }
    }
}

/// One expert's contribution to a turn
///
/// Created `Pending` at dispatch and resolved exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResult {
    pub expert: ExpertProfile,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_uri: Option<String>,
    pub status: WorkerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(default)]
    pub estimated_tokens: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<GroundingCitation>,
    #[serde(default)]
    pub requires_configuration: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_draft: Option<ActionDraft>,
}

impl WorkerResult {
    pub fn pending(expert: ExpertProfile) -> Self {
        Self {
            expert,
            content: String::new(),
            images: Vec::new(),
            video_uri: None,
            status: WorkerStatus::Pending,
            execution_time_ms: None,
            estimated_tokens: 0,
            citations: Vec::new(),
            requires_configuration: false,
            action_draft: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == WorkerStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == WorkerStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == WorkerStatus::Error
    }

    pub fn has_media(&self) -> bool {
        !self.images.is_empty() || self.video_uri.is_some()
    }

    /// Settle a pending result. A second resolution is rejected.
    pub fn resolve(&mut self, outcome: WorkerOutcome) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::WorkerAlreadyResolved(self.expert.id.clone()));
        }

        match outcome {
            WorkerOutcome::Success(output) => {
                self.content = output.content;
                self.images = output.images;
                self.video_uri = output.video_uri;
                self.execution_time_ms = output.execution_time_ms;
                self.estimated_tokens = output.estimated_tokens;
                self.citations = output.citations;
                self.action_draft = output.action_draft;
                self.status = WorkerStatus::Success;
            }
            WorkerOutcome::Failure {
                message,
                requires_configuration,
            } => {
                self.content = format!("Error: {}", message);
                self.requires_configuration = requires_configuration;
                self.status = WorkerStatus::Error;
            }
        }
        Ok(())
    }
}
