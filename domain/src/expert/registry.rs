//! Built-in expert catalog

use super::entities::{ExpertKind, ExpertProfile, ExpertTool};
use crate::core::model::Model;

const REASONING_STUB: &str = "\n\nREASONING PROTOCOL: Before answering, draft a silent plan: \
Step 1: Analyze user intent and any attached media. Step 2: Cross-reference knowledge. \
Step 3: Identify potential errors. Step 4: Final output.";

pub const FLASH_GENERALIST: &str = "flash-generalist";
pub const PRO_REASONER: &str = "pro-reasoner";
pub const ARCHITECT: &str = "architect";
pub const ACTION_AGENT: &str = "action-agent";
pub const IMAGE_EXPERT: &str = "gemini-image";
pub const VIDEO_EXPERT: &str = "veo-video";
pub const AUDITOR: &str = "auditor-critic";

/// Immutable table of experts, looked up by id.
///
/// Order matters: it is the order the router sees, and the first two
/// generalists form the fallback pair.
#[derive(Debug, Clone)]
pub struct ExpertRegistry {
    experts: Vec<ExpertProfile>,
}

impl ExpertRegistry {
    pub fn new(experts: Vec<ExpertProfile>) -> Self {
        Self { experts }
    }

    /// The catalog shipped with the engine
    pub fn builtin() -> Self {
        let specialized = vec![
            ExpertProfile::new(ARCHITECT, "System Architect", ExpertKind::Text, Model::Gemini3Pro)
                .with_role("Visual Design & Infra")
                .with_description("Draws diagrams and plans systems.")
                .with_instruction(
                    "You are a System Architect. Whenever possible, use Mermaid.js syntax to \
                     visualize architectures. Wrap mermaid code in ```mermaid blocks.",
                ),
            ExpertProfile::new(
                ACTION_AGENT,
                "Action Dispatcher",
                ExpertKind::Action,
                Model::Gemini3Flash,
            )
            .with_role("Tool & API Integration")
            .with_description("Drafts emails, tickets, and messages.")
            .with_instruction(
                "You are an Action Dispatcher. If the user asks for a task like 'Email someone' \
                 or 'Send a message', output a JSON block representing the action in this \
                 format: ```json\n{ \"action\": \"draft_action\", \"type\": \"email\", \
                 \"recipient\": \"...\", \"subject\": \"...\", \"body\": \"...\" }\n```",
            ),
            ExpertProfile::new(
                IMAGE_EXPERT,
                "Gemini Image",
                ExpertKind::Image,
                Model::Gemini25FlashImage,
            )
            .with_role("Image Generation")
            .with_description("Generates high-fidelity images.")
            .with_instruction("Generate an image based on the prompt."),
            ExpertProfile::new(VIDEO_EXPERT, "Veo (Video)", ExpertKind::Video, Model::Veo31Fast)
                .with_role("Video Generation")
                .with_description("Generates high-quality 1080p motion.")
                .with_instruction("Generate a video based on the prompt."),
            ExpertProfile::new(AUDITOR, "Consensus Auditor", ExpertKind::Critic, Model::Gemini3Pro)
                .with_role("Fact-Checker & Logic Critic")
                .with_description("Reviews consensus for bias, omissions, or logical flaws.")
                .with_instruction(
                    "You are the Consensus Auditor. Your job is to review the synthesized answer \
                     from the Judge. Identify: 1. Any missed details from expert workers. \
                     2. Logical leaps. 3. Over-confidence. 4. Factual inconsistencies. When \
                     reviewing, distinguish between: - factual errors - framing mismatches. \
                     Flag framing mismatches without demanding correction. Be brief and blunt.",
                ),
        ];

        let general = vec![
            ExpertProfile::new(
                FLASH_GENERALIST,
                "Gemini Flash (Fast)",
                ExpertKind::Text,
                Model::Gemini3Flash,
            )
            .with_role("Speed & Logic")
            .with_description("Quick analytical thinker for rapid turns.")
            .with_instruction(format!(
                "You are an AI assistant optimized for speed and accuracy.{REASONING_STUB}"
            ))
            .with_tool(ExpertTool::WebSearch)
            .as_generalist(),
            ExpertProfile::new(PRO_REASONER, "Gemini Pro (Deep)", ExpertKind::Text, Model::Gemini3Pro)
                .with_role("Complex Nuance")
                .with_description("Uses deeper reasoning for difficult logic problems.")
                .with_instruction(format!(
                    "You are a senior-level AI advisor. Provide exhaustive, deep analysis of the \
                     prompt and attachments.{REASONING_STUB}"
                ))
                .as_generalist(),
        ];

        Self::new(specialized.into_iter().chain(general).collect())
    }

    pub fn all(&self) -> &[ExpertProfile] {
        &self.experts
    }

    pub fn get(&self, id: &str) -> Option<&ExpertProfile> {
        self.experts.iter().find(|e| e.id == id)
    }

    /// Experts the router may select (everything except critics)
    pub fn routable(&self) -> impl Iterator<Item = &ExpertProfile> {
        self.experts.iter().filter(|e| e.kind != ExpertKind::Critic)
    }

    pub fn generalists(&self) -> impl Iterator<Item = &ExpertProfile> {
        self.experts.iter().filter(|e| e.generalist)
    }

    /// The auditor used by the critic stage
    pub fn critic(&self) -> Option<&ExpertProfile> {
        self.experts.iter().find(|e| e.kind == ExpertKind::Critic)
    }

    /// Fallback pair used when routing output is unusable
    pub fn default_selection(&self) -> Vec<ExpertProfile> {
        self.generalists().take(2).cloned().collect()
    }

    /// Single-generalist fallback for a saturated backend
    pub fn degraded_selection(&self) -> Vec<ExpertProfile> {
        self.generalists().take(1).cloned().collect()
    }
}

impl Default for ExpertRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
