//! Expert profile value objects

use crate::core::model::Model;
use serde::{Deserialize, Serialize};

/// Output modality of an expert.
///
/// The worker pool matches on this to decide between a single
/// request/response call and a long-running media job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpertKind {
    Text,
    Image,
    Video,
    Action,
    Critic,
}

impl ExpertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpertKind::Text => "text",
            ExpertKind::Image => "image",
            ExpertKind::Video => "video",
            ExpertKind::Action => "action",
            ExpertKind::Critic => "critic",
        }
    }

    /// Image and video experts produce media rather than prose
    pub fn is_media(&self) -> bool {
        matches!(self, ExpertKind::Image | ExpertKind::Video)
    }
}

impl std::fmt::Display for ExpertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional backend tools an expert may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertTool {
    /// Retrieval-augmented answers with grounding citations
    WebSearch,
}

/// A configured expert (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertProfile {
    pub id: String,
    pub name: String,
    /// Short capability label shown to the router
    pub role: String,
    pub description: String,
    pub model: Model,
    pub kind: ExpertKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ExpertTool>,
    /// Fixed instruction appended to the shared system prompt
    pub instruction: String,
    /// Generalists are the router's fallback set
    #[serde(default)]
    pub generalist: bool,
}

impl ExpertProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ExpertKind,
        model: Model,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: String::new(),
            description: String::new(),
            model,
            kind,
            tools: Vec::new(),
            instruction: String::new(),
            generalist: false,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_tool(mut self, tool: ExpertTool) -> Self {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }

    pub fn as_generalist(mut self) -> Self {
        self.generalist = true;
        self
    }

    pub fn has_tool(&self, tool: ExpertTool) -> bool {
        self.tools.contains(&tool)
    }

    /// One line used in the router's expert listing
    pub fn routing_line(&self) -> String {
        format!("- ID: {} | Name: {} | Role: {}", self.id, self.name, self.role)
    }
}
