//! Thin HTTP client for the Generative Language API

use super::error::{GeminiError, Result};
use super::protocol::{
    ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse, Operation, PredictRequest,
};
use reqwest::Response;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings resolved from configuration and environment
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Dedicated key for paid video generation
    pub video_api_key: Option<String>,
    /// Allow video generation with the main key
    pub video_enabled: bool,
    pub request_timeout: Duration,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            video_api_key: None,
            video_enabled: false,
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl GeminiSettings {
    /// Fill a missing key from `GEMINI_API_KEY`, then `API_KEY`.
    pub fn with_env_fallback(mut self) -> Self {
        if self.api_key.is_none() {
            self.api_key = ["GEMINI_API_KEY", "API_KEY"]
                .iter()
                .find_map(|var| std::env::var(var).ok())
                .filter(|key| !key.trim().is_empty());
        }
        self
    }

    /// Key used for video jobs, if video generation is allowed
    pub fn video_key(&self) -> Option<&str> {
        self.video_api_key.as_deref().or_else(|| {
            self.video_enabled
                .then_some(self.api_key.as_deref())
                .flatten()
        })
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn generate_content(
        &self,
        key: &str,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        self.post_json(key, &url, body).await
    }

    /// Open an SSE stream; the caller consumes the body.
    pub async fn stream_generate_content(
        &self,
        key: &str,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<Response> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        );
        debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, key)
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    pub async fn predict_long_running(
        &self,
        key: &str,
        model: &str,
        body: &PredictRequest,
    ) -> Result<Operation> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, model);
        self.post_json(key, &url, body).await
    }

    /// `name` is the operation name returned on submit
    pub async fn get_operation(&self, key: &str, name: &str) -> Result<Operation> {
        let url = format!("{}/{}", self.base_url, name.trim_start_matches('/'));
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, key)
            .send()
            .await?;
        parse_json(check_status(response).await?).await
    }

    async fn post_json<B, R>(&self, key: &str, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, key)
            .json(body)
            .send()
            .await?;
        parse_json(check_status(response).await?).await
    }
}

async fn parse_json<R: DeserializeOwned>(response: Response) -> Result<R> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Turn a non-success reply into [`GeminiError::Api`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

pub(crate) fn api_error(code: u16, body: &str) -> GeminiError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => GeminiError::Api {
            code: if envelope.error.code == 0 {
                code
            } else {
                envelope.error.code
            },
            status: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => GeminiError::Api {
            code,
            status: String::new(),
            message: body.trim().to_string(),
        },
    }
}
