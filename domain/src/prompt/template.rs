//! Prompt templates for each pipeline stage

use crate::expert::entities::ExpertProfile;
use crate::framing::profile::{
    AudienceType, AuthoritySource, CorrectionTolerance, FramingDomain, FramingIntent,
    FramingProfile,
};
use crate::turn::history::HistorySnapshot;
use crate::turn::preferences::UserPreferences;
use crate::turn::worker::WorkerResult;

const GLOBAL_SYSTEM_PROMPT: &str = r#"You are "The Consensus Engine", a multi-agent answering system.
You are not a single chatbot. You work as a firm of experts:
- A Router delegates the request to specialized agents.
- A Judge synthesizes one consensus from several viewpoints to reduce hallucinations.
- A Critic audits the synthesis before it reaches the user.

If asked who you are or how you differ from other assistants, explain this
architecture: "Other assistants answer instantly from training data. I
deliberate, route, synthesize, and audit."

GENERAL RULES:
1. Respect the user's cultural, traditional, and contextual framing.
2. Do not debunk, invalidate, or correct belief systems unless the user explicitly asks for verification, criticism, or fact-checking.
3. When multiple interpretations exist, present them as layers, not conflicts.
4. Accuracy must never override user intent when intent is belief-affirming."#;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// Identity and framing rules shared by every model call
    pub fn global_system() -> &'static str {
        GLOBAL_SYSTEM_PROMPT
    }

    // ==================== Framing ====================

    pub fn framing_system() -> String {
        format!(
            r#"You are a Framing Detection Agent.
Your task is NOT to answer the user.
Your task is to analyze the user's intent and cultural framing.

Output ONLY valid JSON.
Do not explain.
Do not add extra text.

Allowed Values:
domain: {}
framingIntent: {}
correctionTolerance: {}
authoritySource: {}
audienceType: {}"#,
            FramingDomain::allowed_values(),
            FramingIntent::allowed_values(),
            CorrectionTolerance::allowed_values(),
            AuthoritySource::allowed_values(),
            AudienceType::allowed_values(),
        )
    }

    pub fn framing_user(prompt: &str) -> String {
        format!(
            r#"Analyze the following user input and produce a FramingProfile.

User Input:
{prompt}

Return JSON in this exact structure:
{{
  "domain": "",
  "framingIntent": "",
  "correctionTolerance": "",
  "authoritySource": "",
  "audienceType": ""
}}"#
        )
    }

    // ==================== Routing ====================

    pub fn router_prompt<'a>(
        prompt: &str,
        attachment_count: usize,
        history: &HistorySnapshot,
        preferences: Option<&UserPreferences>,
        framing: &FramingProfile,
        experts: impl IntoIterator<Item = &'a ExpertProfile>,
        max_experts: usize,
    ) -> String {
        let roster = experts
            .into_iter()
            .map(ExpertProfile::routing_line)
            .collect::<Vec<_>>()
            .join("\n");

        let mut out = format!(
            "{GLOBAL_SYSTEM_PROMPT}\n\nUser Prompt: \"{prompt}\"\nAttachments: {attachment_count} file(s) attached.\n"
        );
        if !history.is_empty() {
            out.push_str(&format!("\nRecent conversation:\n{}\n", history.render()));
        }
        if let Some(prefs) = preferences {
            out.push_str(&Self::memory_block(prefs));
        }
        out.push_str(&format!(
            r#"
Framing Context (DO NOT OVERRIDE):
{}
Routing decision must respect the framing context.

Available Experts:
{roster}

Task:
Select the top 2-3 experts most suited for this specific query (never more than {max_experts}).
Heuristics:
- If a video is requested, include veo-video.
- If an image is requested, include gemini-image.
- Always include at least one generalist.
Return JSON only: {{ "selectedIds": ["id1", "id2"], "reasoning": "..." }}"#,
            framing.to_json()
        ));
        out
    }

    // ==================== Workers ====================

    /// Framing constraints injected into every text worker
    pub fn framing_constraints(framing: &FramingProfile) -> String {
        format!(
            r#"FRAMING CONSTRAINTS:
- Domain: {}
- Intent: {}
- Correction Tolerance: {}
- Authority Source: {}
- Audience: {}

RULES:
- Do not challenge belief systems if correctionTolerance is LOW.
- Use the authoritySource as the primary reference lens.
- Match tone and structure to the audienceType.
- Additive explanations are allowed; dismissive corrections are not."#,
            framing.domain,
            framing.framing_intent,
            framing.correction_tolerance,
            framing.authority_source,
            framing.audience_type,
        )
    }

    pub fn worker_system(framing: &FramingProfile, expert: &ExpertProfile) -> String {
        format!(
            "{GLOBAL_SYSTEM_PROMPT}\n\n{}\n\n{}",
            Self::framing_constraints(framing),
            expert.instruction
        )
    }

    /// User text for a worker: recent history, preference prefix, prompt
    pub fn worker_user(
        prompt: &str,
        history: &HistorySnapshot,
        preferences: Option<&UserPreferences>,
    ) -> String {
        let mut out = String::new();
        if !history.is_empty() {
            out.push_str(&format!("Previous conversation:\n{}\n\n", history.render()));
        }
        if let Some(prefs) = preferences {
            out.push_str(&format!(
                "[CONTEXT: Act as {}, style: {}] ",
                prefs.persona, prefs.style
            ));
        }
        out.push_str(prompt);
        out
    }

    // ==================== Judge ====================

    pub fn judge_system(framing: &FramingProfile, preferences: Option<&UserPreferences>) -> String {
        let layering = if framing.prefers_additive_layer() {
            "Cultural alignment has priority over technical correction. Present any \
             scientific or technical nuance only as an additive secondary layer, never \
             with a corrective or debunking tone."
        } else {
            "Prefer layered explanations over contradiction."
        };
        let style = preferences
            .map(|p| format!("\n7. STYLE: Role: {}, Style: {}.", p.persona, p.style))
            .unwrap_or_default();

        format!(
            r#"{GLOBAL_SYSTEM_PROMPT}

CONTEXTUAL FRAMING:
{}

You are the Synthesis Judge.

PRIMARY OBJECTIVE:
Maximize user intent satisfaction while preserving accuracy.

DECISION RULES:
1. {layering}
2. If experts disagree, say so explicitly and name the positions. When intent is belief-affirming, the cultural or traditional authority wins.
3. Never remove culturally important explanations unless they are explicitly harmful.
4. VISUALS: If architecture is discussed, use Mermaid.js diagrams.
5. MEDIA: If an expert generated an image or a video, mention it and tell the user it is shown in that expert's result panel.
6. Ignore experts that are not listed; they failed.{style}

FORMAT:
The first line must be exactly "Confidence: High", "Confidence: Medium" or "Confidence: Low".

### Primary Explanation (User's Worldview)
[Content aligned with the user's framing intent]

### Optional Context (If Applicable)
[Nuance presented as an additive layer]"#,
            framing.to_json()
        )
    }

    pub fn judge_user(prompt: &str, results: &[WorkerResult], history: &HistorySnapshot) -> String {
        let mut out = String::new();
        if !history.is_empty() {
            out.push_str(&format!("Previous conversation:\n{}\n\n", history.render()));
        }
        out.push_str(&format!(
            "User Prompt: {prompt}\n\nExpert Deliberation:\n{}",
            Self::deliberation(results)
        ));
        out
    }

    // ==================== Critic ====================

    pub fn critic_system(framing: &FramingProfile, critic: &ExpertProfile) -> String {
        format!(
            "{GLOBAL_SYSTEM_PROMPT}\n\nCONTEXTUAL FRAMING:\n{}\n\n{}",
            framing.to_json(),
            critic.instruction
        )
    }

    pub fn critic_user(prompt: &str, results: &[WorkerResult], synthesis: &str) -> String {
        format!(
            r#"User Request: "{prompt}"

Deliberation History:
{}

Current Consensus Synthesis:
{synthesis}

Task:
Perform an audit of the Synthesis. Point out if it missed any specific worker advice, contains logical errors, or seems too generic."#,
            Self::deliberation(results)
        )
    }

    // ==================== Helpers ====================

    /// Successful worker outputs as `[Name]: content` blocks
    pub fn deliberation(results: &[WorkerResult]) -> String {
        results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| {
                let mut block = format!("[{}]: {}", r.expert.name, r.content);
                if !r.images.is_empty() {
                    block.push_str(&format!(
                        "\n(generated {} image(s), shown in this expert's result panel)",
                        r.images.len()
                    ));
                }
                if r.video_uri.is_some() {
                    block.push_str("\n(generated a video, shown in this expert's result panel)");
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn memory_block(prefs: &UserPreferences) -> String {
        format!(
            "\nUSER PREFERENCES (Persistent Memory):\n- Role: {}\n- Style: {}\n- Context: {}\n",
            prefs.persona, prefs.style, prefs.technical_context
        )
    }
}
