//! Output format value object

use serde::{Deserialize, Serialize};

/// How a finished turn is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Worker panels, synthesis, audit and token count
    Full,
    /// Only the synthesized answer (default)
    #[default]
    Answer,
    /// The whole turn as JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(OutputFormat::Full),
            "answer" | "synthesis" => Ok(OutputFormat::Answer),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}' (full, answer, json)")),
        }
    }
}
