//! Framing profile value object and its closed value sets

use crate::core::json::extract_json_object;
use serde::{Deserialize, Serialize};

/// Declares a closed-set string enum with kebab-case wire names.
macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident, { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Comma-separated list of allowed values, for prompts
            pub fn allowed_values() -> String {
                Self::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
                match normalized.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }
    };
}

closed_set!(
    /// Subject area of the request
    FramingDomain, default = Mixed, {
        Astrology => "astrology",
        Religion => "religion",
        Culture => "culture",
        Science => "science",
        Business => "business",
        Technology => "technology",
        Personal => "personal",
        Mixed => "mixed",
    }
);

closed_set!(
    /// What the user wants the answer to do
    FramingIntent, default = EducationalNeutral, {
        BeliefAffirming => "belief-affirming",
        EducationalNeutral => "educational-neutral",
        CriticalAnalysis => "critical-analysis",
        Storytelling => "storytelling",
        CulturalPreservation => "cultural-preservation",
    }
);

closed_set!(
    /// How welcome corrective statements are
    CorrectionTolerance, default = Medium, {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

closed_set!(
    /// Primary reference lens for the answer
    AuthoritySource, default = Mixed, {
        Tradition => "tradition",
        Scientific => "scientific",
        Experiential => "experiential",
        Textual => "textual",
        Mixed => "mixed",
    }
);

closed_set!(
    /// Who the answer is written for
    AudienceType, default = GeneralPublic, {
        GeneralPublic => "general-public",
        Devotional => "devotional",
        Academic => "academic",
        Professional => "professional",
    }
);

/// Framing profile of one request (Value Object)
///
/// The `Default` value is the fallback profile used whenever detection
/// fails: `{mixed, educational-neutral, medium, mixed, general-public}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FramingProfile {
    pub domain: FramingDomain,
    pub framing_intent: FramingIntent,
    pub correction_tolerance: CorrectionTolerance,
    pub authority_source: AuthoritySource,
    pub audience_type: AudienceType,
}

/// Loose wire shape; every field is optional so one bad value does not
/// sink the whole profile.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawFramingProfile {
    domain: Option<String>,
    framing_intent: Option<String>,
    correction_tolerance: Option<String>,
    authority_source: Option<String>,
    audience_type: Option<String>,
}

impl FramingProfile {
    /// Parse a classifier reply.
    ///
    /// Returns `None` when the reply holds no JSON object, or when
    /// `framingIntent` is missing or outside its value set; the caller then
    /// uses [`FramingProfile::default`]. Unknown values in the other fields
    /// fall back to that field's default.
    pub fn parse(reply: &str) -> Option<Self> {
        let json = extract_json_object(reply)?;
        let raw: RawFramingProfile = serde_json::from_str(json).ok()?;

        let framing_intent = raw.framing_intent.as_deref()?.parse().ok()?;

        Some(Self {
            domain: field_or_default(raw.domain.as_deref()),
            framing_intent,
            correction_tolerance: field_or_default(raw.correction_tolerance.as_deref()),
            authority_source: field_or_default(raw.authority_source.as_deref()),
            audience_type: field_or_default(raw.audience_type.as_deref()),
        })
    }

    /// Low tolerance or belief-affirming intent: corrections must be
    /// presented as an additive secondary layer.
    pub fn prefers_additive_layer(&self) -> bool {
        self.correction_tolerance == CorrectionTolerance::Low
            || self.framing_intent == FramingIntent::BeliefAffirming
    }

    /// Compact JSON rendering embedded into prompts
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn field_or_default<T>(value: Option<&str>) -> T
where
    T: std::str::FromStr + Default,
{
    value.and_then(|v| v.parse().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> FramingProfile {
        FramingProfile {
            domain: FramingDomain::Mixed,
            framing_intent: FramingIntent::EducationalNeutral,
            correction_tolerance: CorrectionTolerance::Medium,
            authority_source: AuthoritySource::Mixed,
            audience_type: AudienceType::GeneralPublic,
        }
    }

    #[test]
    fn test_default_is_fallback_profile() {
        assert_eq!(FramingProfile::default(), fallback());
    }

    #[test]
    fn test_parse_full_profile() {
        let reply = r#"{
            "domain": "astrology",
            "framingIntent": "belief-affirming",
            "correctionTolerance": "low",
            "authoritySource": "tradition",
            "audienceType": "devotional"
        }"#;
        let profile = FramingProfile::parse(reply).unwrap();
        assert_eq!(profile.domain, FramingDomain::Astrology);
        assert_eq!(profile.framing_intent, FramingIntent::BeliefAffirming);
        assert_eq!(profile.correction_tolerance, CorrectionTolerance::Low);
        assert_eq!(profile.authority_source, AuthoritySource::Tradition);
        assert_eq!(profile.audience_type, AudienceType::Devotional);
        assert!(profile.prefers_additive_layer());
    }

    #[test]
    fn test_parse_rejects_missing_intent() {
        assert!(FramingProfile::parse(r#"{"domain": "science"}"#).is_none());
        assert!(FramingProfile::parse(r#"{"framingIntent": ""}"#).is_none());
        assert!(FramingProfile::parse(r#"{"framingIntent": "rant"}"#).is_none());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(FramingProfile::parse("").is_none());
        assert!(FramingProfile::parse("{}").is_none());
        assert!(FramingProfile::parse("{not json}").is_none());
        assert!(FramingProfile::parse("sorry, I cannot help").is_none());
    }

    #[test]
    fn test_unknown_secondary_values_use_field_default() {
        let reply = r#"{"framingIntent": "storytelling", "domain": "cooking", "audienceType": "Academic"}"#;
        let profile = FramingProfile::parse(reply).unwrap();
        assert_eq!(profile.framing_intent, FramingIntent::Storytelling);
        assert_eq!(profile.domain, FramingDomain::Mixed);
        assert_eq!(profile.audience_type, AudienceType::Academic);
        assert_eq!(profile.correction_tolerance, CorrectionTolerance::Medium);
    }

    #[test]
    fn test_wire_names_are_camel_and_kebab() {
        let json = fallback().to_json();
        assert!(json.contains("\"framingIntent\":\"educational-neutral\""));
        assert!(json.contains("\"audienceType\":\"general-public\""));
    }

    #[test]
    fn test_allowed_values_listing() {
        assert_eq!(CorrectionTolerance::allowed_values(), "low, medium, high");
    }
}
