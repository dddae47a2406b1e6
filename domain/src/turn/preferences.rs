//! User preferences ("persistent memory")

use serde::{Deserialize, Serialize};

/// Free-text preferences injected verbatim into prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    /// e.g. "Senior Engineer"
    pub persona: String,
    /// e.g. "Brief and code-heavy"
    pub style: String,
    /// e.g. "Using AWS and Node.js"
    pub technical_context: String,
    /// When off, preferences are kept but not sent to the models
    pub memory_enabled: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            persona: "Professional Consultant".to_string(),
            style: "Logical & Structured".to_string(),
            technical_context: "General knowledge".to_string(),
            memory_enabled: true,
        }
    }
}

impl UserPreferences {
    /// Preferences that should reach the prompts, if any
    pub fn active(&self) -> Option<&Self> {
        self.memory_enabled.then_some(self)
    }
}
