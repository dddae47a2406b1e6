//! Console output formatter for chat turns

use colored::{ColoredString, Colorize};
use consensus_domain::{ChatTurn, Confidence, OutputFormat, WorkerResult, WorkerStatus};

/// Formats chat turns for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn render(turn: &ChatTurn, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => Self::format_full(turn),
            OutputFormat::Answer => Self::format_answer(turn),
            OutputFormat::Json => Self::format_json(turn),
        }
    }

    /// Everything: framing, expert panels, synthesis and audit
    pub fn format_full(turn: &ChatTurn) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Consensus Engine"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Prompt:".cyan().bold(), turn.prompt()));
        if !turn.attachments().is_empty() {
            let names: Vec<&str> = turn.attachments().iter().map(|a| a.name.as_str()).collect();
            output.push_str(&format!("{} {}\n", "Attached:".cyan().bold(), names.join(", ")));
        }
        if let Some(framing) = turn.framing() {
            output.push_str(&format!(
                "{} {} / {} / {} tolerance / {} / {}\n",
                "Framing:".cyan().bold(),
                framing.domain,
                framing.framing_intent,
                framing.correction_tolerance,
                framing.authority_source,
                framing.audience_type
            ));
        }

        output.push_str(&Self::section_header("Expert Input"));
        for result in turn.worker_results() {
            output.push_str(&Self::worker_panel(result));
        }

        output.push_str(&Self::section_header("Consensus"));
        output.push_str(&Self::answer_body(turn));
        output.push_str(&Self::extras(turn));
        output.push_str(&Self::footer(turn));

        output
    }

    /// Synthesis with its audit and any generated artifacts
    pub fn format_answer(turn: &ChatTurn) -> String {
        let mut output = Self::answer_body(turn);
        output.push_str(&Self::extras(turn));
        output
    }

    /// Trailing details printed after a streamed answer
    pub fn format_after_stream(turn: &ChatTurn) -> String {
        let mut output = String::new();
        if let (Some(confidence), _) = turn.confidence() {
            output.push_str(&format!("\n{} {}\n", "Confidence:".bold(), Self::badge(confidence)));
        }
        output.push_str(&Self::extras(turn));
        output
    }

    pub fn format_json(turn: &ChatTurn) -> String {
        serde_json::to_string_pretty(turn).unwrap_or_else(|_| "{}".to_string())
    }

    fn answer_body(turn: &ChatTurn) -> String {
        if let Some(error) = turn.error() {
            return format!("{} {}\n", "Error:".red().bold(), error);
        }

        let (confidence, text) = turn.confidence();
        let mut output = String::new();
        if let Some(confidence) = confidence {
            output.push_str(&format!("{} {}\n\n", "Confidence:".bold(), Self::badge(confidence)));
        }
        output.push_str(&text);
        output.push('\n');
        output
    }

    /// Audit notes, action drafts, citations and media
    fn extras(turn: &ChatTurn) -> String {
        let mut output = String::new();

        if let Some(audit) = turn.audit() {
            output.push_str(&format!("\n{}\n{}\n", "Audit:".magenta().bold(), audit.trim()));
        }

        for result in turn.successful_results() {
            if let Some(draft) = &result.action_draft {
                output.push_str(&format!(
                    "\n{} {} {}\n",
                    "Action draft".green().bold(),
                    format!("({:?})", draft.kind).to_lowercase().dimmed(),
                    draft.subject.as_deref().unwrap_or_default()
                ));
                if let Some(recipient) = &draft.recipient {
                    output.push_str(&format!("  to: {}\n", recipient));
                }
                output.push_str(&format!("  {}\n", draft.body));
                if let Some(uri) = draft.mailto_uri() {
                    output.push_str(&format!("  {}\n", uri.underline()));
                }
            }
            if !result.images.is_empty() {
                output.push_str(&format!(
                    "\n{} {} image(s) from {}\n",
                    "Image:".green().bold(),
                    result.images.len(),
                    result.expert.name
                ));
            }
            if let Some(uri) = &result.video_uri {
                output.push_str(&format!(
                    "\n{} {}\n  (download requires the video API key)\n",
                    "Video:".green().bold(),
                    uri.underline()
                ));
            }
        }

        let citations: Vec<_> = turn
            .successful_results()
            .flat_map(|r| r.citations.iter())
            .collect();
        if !citations.is_empty() {
            output.push_str(&format!("\n{}\n", "Sources:".cyan().bold()));
            for citation in citations {
                output.push_str(&format!("  * {} {}\n", citation.label(), citation.uri.dimmed()));
            }
        }

        let unconfigured: Vec<&str> = turn
            .worker_results()
            .iter()
            .filter(|r| r.requires_configuration)
            .map(|r| r.expert.name.as_str())
            .collect();
        if !unconfigured.is_empty() {
            output.push_str(&format!(
                "\n{} {} need an API key; set backend.video_api_key or CONSENSUS_BACKEND__VIDEO_API_KEY\n",
                "Hint:".yellow().bold(),
                unconfigured.join(", ")
            ));
        }

        output
    }

    fn worker_panel(result: &WorkerResult) -> String {
        let timing = result
            .execution_time_ms
            .map(|ms| format!(" {:.1}s", ms as f64 / 1000.0))
            .unwrap_or_default();
        let title = format!("── {} ({}){} ──", result.expert.name, result.expert.role, timing);
        match result.status {
            WorkerStatus::Success => format!("\n{}\n{}\n", title.yellow().bold(), result.content.trim()),
            WorkerStatus::Error => format!(
                "\n{}\nError: {}\n",
                title.red().bold(),
                result.content
            ),
            WorkerStatus::Pending => format!("\n{}\n(no response)\n", title.dimmed()),
        }
    }

    fn badge(confidence: Confidence) -> ColoredString {
        let label = format!(" {} ", confidence.as_str());
        match confidence {
            Confidence::High => label.black().on_green(),
            Confidence::Medium => label.black().on_yellow(),
            Confidence::Low => label.white().on_red(),
        }
    }

    fn header(title: &str) -> String {
        let line = "═".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.cyan().bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n", format!("━━━ {} ━━━", title).cyan().bold())
    }

    fn footer(turn: &ChatTurn) -> String {
        format!(
            "\n{}\n",
            format!("{} tokens (estimated)", turn.total_tokens()).dimmed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_domain::{
        ActionDraft, ActionKind, ExpertKind, ExpertProfile, FramingProfile, Model, WorkerOutcome,
        WorkerOutput,
    };

    fn finished_turn() -> ChatTurn {
        let mut turn = ChatTurn::new("Email Bob about lunch", vec![], None);
        turn.complete_framing(FramingProfile::default()).unwrap();
        turn.complete_routing(vec![
            ExpertProfile::new("action-agent", "Action Dispatcher", ExpertKind::Action, Model::Gemini3Flash),
            ExpertProfile::new("pro-reasoner", "Gemini Pro (Deep)", ExpertKind::Text, Model::Gemini3Pro),
        ])
        .unwrap();

        let mut results = turn.worker_results().to_vec();
        let draft = ActionDraft {
            kind: ActionKind::Email,
            recipient: Some("bob@example.com".to_string()),
            subject: Some("Lunch".to_string()),
            body: "Noon?".to_string(),
            platform: None,
        };
        results[0]
            .resolve(WorkerOutcome::Success(
                WorkerOutput::text("Drafted.", 4).with_action_draft(Some(draft)),
            ))
            .unwrap();
        results[1].resolve(WorkerOutcome::failure("quota exceeded")).unwrap();
        turn.complete_gathering(results).unwrap();
        turn.append_synthesis("Confidence: High\nSend the draft below.").unwrap();
        turn.complete_judging(6).unwrap();
        turn.complete_audit("No issues.", 2).unwrap();
        turn
    }

    #[test]
    fn test_answer_strips_marker_and_shows_audit() {
        colored::control::set_override(false);
        let output = ConsoleFormatter::format_answer(&finished_turn());
        assert!(output.starts_with("Confidence:  HIGH "));
        assert!(output.contains("Send the draft below."));
        assert!(!output.contains("Confidence: High"));
        assert!(output.contains("Audit:\nNo issues."));
        assert!(output.contains("mailto:bob@example.com?subject=Lunch&body=Noon%3F"));
    }

    #[test]
    fn test_full_lists_every_worker() {
        colored::control::set_override(false);
        let output = ConsoleFormatter::format_full(&finished_turn());
        assert!(output.contains("── Action Dispatcher ()"));
        assert!(output.contains("Error: quota exceeded"));
        assert!(output.contains("12 tokens (estimated)"));
    }

    #[test]
    fn test_json_is_the_turn_record() {
        let turn = finished_turn();
        let value: serde_json::Value =
            serde_json::from_str(&ConsoleFormatter::format_json(&turn)).unwrap();
        assert_eq!(value["stage"], "complete");
        assert_eq!(value["id"], turn.id());
    }

    #[test]
    fn test_failed_turn_shows_error() {
        colored::control::set_override(false);
        let mut turn = ChatTurn::new("hi", vec![], None);
        turn.fail("Critical process failure.").unwrap();
        let output = ConsoleFormatter::render(&turn, OutputFormat::Answer);
        assert_eq!(output, "Error: Critical process failure.\n");
    }
}
