//! Generation response

use crate::turn::worker::GroundingCitation;

/// Binary output returned inline (generated images)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub text: String,
    pub media: Vec<InlineMedia>,
    pub citations: Vec<GroundingCitation>,
}

impl GenerateResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_media(mut self, media: InlineMedia) -> Self {
        self.media.push(media);
        self
    }

    pub fn with_citation(mut self, citation: GroundingCitation) -> Self {
        self.citations.push(citation);
        self
    }

    /// Base64 payloads of returned images
    pub fn images(&self) -> Vec<String> {
        self.media
            .iter()
            .filter(|m| m.mime_type.starts_with("image/"))
            .map(|m| m.data.clone())
            .collect()
    }
}
