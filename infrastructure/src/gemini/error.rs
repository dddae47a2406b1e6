//! Error types for the Gemini adapter

use consensus_application::GatewayError;
use thiserror::Error;

/// Result type alias for Gemini operations
pub type Result<T> = std::result::Result<T, GeminiError>;

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Non-success reply; `status` is the API status string when present
    /// (e.g. `RESOURCE_EXHAUSTED`)
    #[error("API error {code} {status}: {message}")]
    Api {
        code: u16,
        status: String,
        message: String,
    },

    #[error("No API key configured (set backend.api_key, GEMINI_API_KEY or API_KEY)")]
    MissingApiKey,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<GeminiError> for GatewayError {
    fn from(error: GeminiError) -> Self {
        match error {
            // the rendered message carries the status string for the quota check
            GeminiError::Api { code, .. } => GatewayError::from_backend(Some(code), error.to_string()),
            GeminiError::MissingApiKey => GatewayError::MissingCredentials(error.to_string()),
            GeminiError::Http(ref e) if e.is_timeout() => GatewayError::Timeout,
            GeminiError::Http(ref e) if e.is_connect() => GatewayError::ConnectionError(e.to_string()),
            GeminiError::Serialization(_) | GeminiError::UnexpectedResponse(_) => {
                GatewayError::InvalidResponse(error.to_string())
            }
            other => GatewayError::from_backend(None, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: u16, status: &str, message: &str) -> GeminiError {
        GeminiError::Api {
            code,
            status: status.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_rate_limit_mapping() {
        assert!(GatewayError::from(api(429, "", "slow down")).is_rate_limited());
        assert!(GatewayError::from(api(400, "RESOURCE_EXHAUSTED", "busy")).is_rate_limited());
        assert!(GatewayError::from(api(403, "PERMISSION_DENIED", "Quota exceeded")).is_rate_limited());
        assert!(!GatewayError::from(api(500, "INTERNAL", "oops")).is_rate_limited());
    }

    #[test]
    fn test_missing_key_maps_to_credentials() {
        assert!(matches!(
            GatewayError::from(GeminiError::MissingApiKey),
            GatewayError::MissingCredentials(_)
        ));
    }

    #[test]
    fn test_stream_error_with_quota_text_is_rate_limited() {
        let error = GeminiError::Stream("quota exhausted".to_string());
        assert!(GatewayError::from(error).is_rate_limited());
    }
}
