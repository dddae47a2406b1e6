//! Model value object representing a backend model identifier

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Backend models known to the engine (Value Object)
///
/// Experts reference one of these; anything unrecognised is carried
/// verbatim as [`Model::Custom`] so new backend releases can be configured
/// without a code change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// Fast text model, also used for framing and routing
    Gemini3Flash,
    /// Deep reasoning text model, used by the judge and the critic
    Gemini3Pro,
    /// Image generation model
    Gemini25FlashImage,
    /// Long-running video generation model
    Veo31Fast,
    Custom(String),
}

impl Model {
    /// Get the string identifier for this model
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gemini3Flash => "gemini-3-flash-preview",
            Model::Gemini3Pro => "gemini-3-pro-preview",
            Model::Gemini25FlashImage => "gemini-2.5-flash-image",
            Model::Veo31Fast => "veo-3.1-fast-generate-preview",
            Model::Custom(s) => s,
        }
    }

    /// Model used for the quick structured calls (framing, routing)
    pub fn fast() -> Self {
        Model::Gemini3Flash
    }

    /// Model used for synthesis
    pub fn deep() -> Self {
        Model::Gemini3Pro
    }

    /// Check if this model produces media through long-running jobs
    pub fn is_video(&self) -> bool {
        matches!(self, Model::Veo31Fast)
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Gemini3Flash
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "gemini-3-flash-preview" => Model::Gemini3Flash,
            "gemini-3-pro-preview" => Model::Gemini3Pro,
            "gemini-2.5-flash-image" => Model::Gemini25FlashImage,
            "veo-3.1-fast-generate-preview" => Model::Veo31Fast,
            other => Model::Custom(other.to_string()),
        })
    }
}

impl From<&str> for Model {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(model) => model,
            Err(never) => match never {},
        }
    }
}

impl Serialize for Model {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Model::from(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_roundtrip() {
        for model in [
            Model::Gemini3Flash,
            Model::Gemini3Pro,
            Model::Gemini25FlashImage,
            Model::Veo31Fast,
        ] {
            let parsed: Model = model.to_string().parse().unwrap();
            assert_eq!(model, parsed);
        }
    }

    #[test]
    fn test_custom_model() {
        let model: Model = "gemini-4-ultra".parse().unwrap();
        assert_eq!(model, Model::Custom("gemini-4-ultra".to_string()));
        assert_eq!(model.to_string(), "gemini-4-ultra");
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&Model::Veo31Fast).unwrap();
        assert_eq!(json, "\"veo-3.1-fast-generate-preview\"");
        let back: Model = serde_json::from_str(&json).unwrap();
        assert!(back.is_video());
    }
}
