//! Generative Language API wire types
//!
//! Only the fields the engine reads or writes are modelled; everything else
//! in the replies is ignored.

use consensus_domain::{
    ContentPart, GenerateRequest, GenerateResponse, GroundingCitation, InlineMedia,
    MediaJobRequest, MediaJobStatus,
};
use serde::{Deserialize, Serialize};

// ==================== generateContent ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    /// Set on thought-summary parts, which are not part of the answer
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub thought: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

impl From<&GenerateRequest> for GenerateContentRequest {
    fn from(request: &GenerateRequest) -> Self {
        // Inline data goes first so the text can refer to "the attached files"
        let mut parts: Vec<Part> = request
            .parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::InlineData { mime_type, data } => Some(Part {
                    inline_data: Some(Blob {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    }),
                    ..Default::default()
                }),
                ContentPart::Text(_) => None,
            })
            .collect();
        parts.extend(request.parts.iter().filter_map(|part| match part {
            ContentPart::Text(text) => Some(Part::text(text)),
            ContentPart::InlineData { .. } => None,
        }));

        let generation_config = (request.json_output || request.thinking_budget.is_some())
            .then(|| GenerationConfig {
                response_mime_type: request
                    .json_output
                    .then(|| "application/json".to_string()),
                thinking_config: request
                    .thinking_budget
                    .map(|thinking_budget| ThinkingConfig { thinking_budget }),
            });

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: request.system_instruction.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part::text(text)],
            }),
            tools: if request.web_search {
                vec![Tool {
                    google_search: Some(GoogleSearch {}),
                }]
            } else {
                Vec::new()
            },
            generation_config,
        }
    }
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
    }

    /// Answer text of the first candidate, thought parts excluded
    pub fn text(&self) -> String {
        self.parts()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    /// Why the prompt was refused, if it was
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }

    pub fn into_domain(self) -> GenerateResponse {
        let text = self.text();
        let media = self
            .parts()
            .filter_map(|p| p.inline_data.as_ref())
            .map(|blob| InlineMedia {
                mime_type: blob.mime_type.clone(),
                data: blob.data.clone(),
            })
            .collect();
        let citations = self
            .candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .filter_map(|web| {
                        let uri = web.uri.as_deref()?;
                        Some(GroundingCitation::new(
                            web.title.as_deref().unwrap_or(uri),
                            uri,
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();

        GenerateResponse {
            text,
            media,
            citations,
        }
    }
}

// ==================== Errors ====================

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

// ==================== predictLongRunning ====================

#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: PredictParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictInstance {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub number_of_videos: u32,
    pub resolution: String,
    pub aspect_ratio: String,
}

impl From<&MediaJobRequest> for PredictRequest {
    fn from(request: &MediaJobRequest) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: request.prompt.clone(),
            }],
            parameters: PredictParameters {
                number_of_videos: 1,
                resolution: request.resolution.clone(),
                aspect_ratio: request.aspect_ratio.clone(),
            },
        }
    }
}

/// Long-running operation as returned by submit and poll
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
    #[serde(default)]
    pub response: Option<OperationResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<VideoResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<VideoSample>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoSample {
    #[serde(default)]
    pub video: Option<VideoRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoRef {
    #[serde(default)]
    pub uri: Option<String>,
}

impl Operation {
    pub fn status(&self) -> MediaJobStatus {
        if !self.done {
            return MediaJobStatus::Running;
        }
        let video_uri = self
            .response
            .as_ref()
            .and_then(|r| r.generate_video_response.as_ref())
            .and_then(|r| r.generated_samples.first())
            .and_then(|s| s.video.as_ref())
            .and_then(|v| v.uri.clone());
        MediaJobStatus::Done { video_uri }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_domain::{FileAttachment, Model};
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest::new(Model::Gemini3Flash)
            .with_system("be brief")
            .with_attachments(&[FileAttachment::new("a.png", "image/png", "AAAA")])
            .with_text("describe")
            .with_web_search(true)
            .json()
            .with_thinking_budget(2048);

        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                        {"text": "describe"}
                    ]
                }],
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "tools": [{"googleSearch": {}}],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "thinkingConfig": {"thinkingBudget": 2048}
                }
            })
        );
    }

    #[test]
    fn test_plain_request_omits_optional_sections() {
        let request = GenerateRequest::new(Model::Gemini3Flash).with_text("hi");
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_to_domain() {
        let reply: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "planning...", "thought": true},
                    {"text": "Rust is "},
                    {"text": "fast."},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBO"}}
                ]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://rust-lang.org", "title": "Rust"}},
                    {"retrievedContext": {}},
                    {"web": {"uri": "https://doc.rust-lang.org"}}
                ]}
            }]
        }))
        .unwrap();

        let response = reply.into_domain();
        assert_eq!(response.text, "Rust is fast.");
        assert_eq!(response.images(), vec!["iVBO".to_string()]);
        assert_eq!(response.citations.len(), 2);
        assert_eq!(response.citations[0].title, "Rust");
        assert_eq!(response.citations[1].title, "https://doc.rust-lang.org");
    }

    #[test]
    fn test_blocked_prompt() {
        let reply: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert_eq!(reply.block_reason(), Some("SAFETY"));
        assert_eq!(reply.text(), "");
    }

    #[test]
    fn test_operation_status() {
        let running: Operation =
            serde_json::from_value(json!({"name": "models/veo/operations/1"})).unwrap();
        assert_eq!(running.status(), MediaJobStatus::Running);

        let done: Operation = serde_json::from_value(json!({
            "name": "models/veo/operations/1",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [
                {"video": {"uri": "https://example.com/v.mp4"}}
            ]}}
        }))
        .unwrap();
        assert_eq!(
            done.status(),
            MediaJobStatus::Done {
                video_uri: Some("https://example.com/v.mp4".to_string())
            }
        );

        let empty: Operation = serde_json::from_value(json!({"done": true})).unwrap();
        assert_eq!(empty.status(), MediaJobStatus::Done { video_uri: None });
    }

    #[test]
    fn test_predict_request_shape() {
        let job = MediaJobRequest::video(Model::Veo31Fast, "a cat surfing");
        let body = serde_json::to_value(PredictRequest::from(&job)).unwrap();
        assert_eq!(body["instances"][0]["prompt"], "a cat surfing");
        assert_eq!(body["parameters"]["resolution"], "1080p");
        assert_eq!(body["parameters"]["aspectRatio"], "16:9");
        assert_eq!(body["parameters"]["numberOfVideos"], 1);
    }
}
