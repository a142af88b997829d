//! Google Gemini `generateContent` client

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{LlmClient, http_client, require_key};
use crate::config::LlmConfig;
use crate::{Error, Result};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini client for single-turn replies
pub struct GeminiClient {
    client: Client,
    api_key: SecretString,
    url: String,
}

impl GeminiClient {
    /// Create a client for `config.model`
    ///
    /// # Errors
    ///
    /// Returns error if the key is blank or the HTTP client cannot be built
    pub fn new(api_key: SecretString, config: &LlmConfig) -> Result<Self> {
        Self::with_base_url(api_key, config, BASE_URL)
    }

    /// Create a client against a different API root
    ///
    /// # Errors
    ///
    /// Returns error if the key is blank or the HTTP client cannot be built
    pub fn with_base_url(
        api_key: SecretString,
        config: &LlmConfig,
        base_url: &str,
    ) -> Result<Self> {
        require_key(&api_key, "Gemini")?;

        Ok(Self {
            client: http_client(config)?,
            api_key,
            url: format!(
                "{}/{}:generateContent",
                base_url.trim_end_matches('/'),
                config.model
            ),
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = GeminiRequest::new(system, prompt);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                if e.is_timeout() {
                    Error::Llm(format!("Gemini request timeout: {e}"))
                } else if e.is_connect() {
                    Error::Llm(format!("Gemini connection failed: {e}"))
                } else {
                    Error::Llm(format!("Gemini request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Llm(format!("Gemini response read failed: {}", e.without_url())))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |e| e.error.message);
            return Err(match status.as_u16() {
                401 | 403 => Error::Llm(format!("Gemini authentication failed: {message}")),
                429 => Error::Llm(format!("Gemini rate limit exceeded: {message}")),
                _ => Error::Llm(format!("Gemini API error {status}: {message}")),
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)?;
        let text = parsed.text()?;
        tracing::debug!(chars = text.chars().count(), "Gemini reply received");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

impl GeminiRequest {
    fn new(system: &str, prompt: &str) -> Self {
        let system_instruction = (!system.trim().is_empty()).then(|| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: system.to_string(),
            }],
        });

        Self {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Result<String> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Llm("no candidates in Gemini response".to_string()))?;

        if let Some(reason) = candidate.finish_reason.as_deref()
            && reason != "STOP"
            && reason != "MAX_TOKENS"
        {
            tracing::warn!(reason, "Gemini stopped early");
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
