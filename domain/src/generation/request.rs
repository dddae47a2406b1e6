//! Generation request

use crate::core::model::Model;
use crate::turn::attachment::FileAttachment;

/// One piece of user content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Base64 payload with its MIME type
    InlineData { mime_type: String, data: String },
}

impl From<&FileAttachment> for ContentPart {
    fn from(file: &FileAttachment) -> Self {
        ContentPart::InlineData {
            mime_type: file.mime_type.clone(),
            data: file.data.clone(),
        }
    }
}

/// Single call to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: Model,
    pub system_instruction: Option<String>,
    pub parts: Vec<ContentPart>,
    /// Ground the answer with web search
    pub web_search: bool,
    /// Ask for a bare JSON reply
    pub json_output: bool,
    pub thinking_budget: Option<u32>,
}

impl GenerateRequest {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            system_instruction: None,
            parts: Vec::new(),
            web_search: false,
            json_output: false,
            thinking_budget: None,
        }
    }

    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(ContentPart::Text(text.into()));
        self
    }

    pub fn with_attachments(mut self, files: &[FileAttachment]) -> Self {
        self.parts.extend(files.iter().map(ContentPart::from));
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }

    /// All text parts joined, for logging and scripted backends
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
