//! Language model clients and the assistant responder
//!
//! [`LlmClient`] is one request/response exchange with a hosted model.
//! [`AssistantResponder`] wraps an optional client with the configured
//! system prompt and turns every failure into a spoken fallback reply, so
//! the session never sees an error from this side.

mod gemini;
mod openai;

use async_trait::async_trait;
use secrecy::SecretString;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use crate::config::{ApiKeys, LlmConfig, LlmProvider};
use crate::session::Responder;
use crate::Result;

/// A hosted text-generation model
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a single reply to `prompt` under the `system` instruction
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the model returns no text
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}

/// [`Responder`] that never fails
pub struct AssistantResponder {
    client: Option<Box<dyn LlmClient>>,
    system_prompt: String,
    fallback_reply: String,
    unavailable_reply: String,
}

impl std::fmt::Debug for AssistantResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantResponder")
            .field("client", &self.client.as_ref().map(|c| c.name()))
            .field("fallback_reply", &self.fallback_reply)
            .field("unavailable_reply", &self.unavailable_reply)
            .finish_non_exhaustive()
    }
}

impl AssistantResponder {
    /// Wrap `client` with the prompts and replies from `config`
    #[must_use]
    pub fn new(client: Option<Box<dyn LlmClient>>, config: &LlmConfig) -> Self {
        Self {
            client,
            system_prompt: config.system_prompt.clone(),
            fallback_reply: config.fallback_reply.clone(),
            unavailable_reply: config.unavailable_reply.clone(),
        }
    }

    /// Build the configured provider
    ///
    /// A missing API key is not an error: the responder is created without
    /// a model and answers every prompt with the unavailable reply.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &LlmConfig, keys: &ApiKeys) -> Result<Self> {
        let client = match config.provider {
            LlmProvider::Gemini => keys
                .gemini
                .clone()
                .map(|key| boxed(GeminiClient::new(key, config)))
                .transpose()?,
            LlmProvider::OpenAi => keys
                .openai
                .clone()
                .map(|key| boxed(OpenAiClient::new(key, config)))
                .transpose()?,
        };

        if client.is_none() {
            tracing::warn!(
                provider = ?config.provider,
                "no API key for language model, replies will be canned"
            );
        }

        Ok(Self::new(client, config))
    }

    /// Whether a model is configured
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.client.is_some()
    }
}

fn boxed<C: LlmClient + 'static>(client: Result<C>) -> Result<Box<dyn LlmClient>> {
    client.map(|c| Box::new(c) as Box<dyn LlmClient>)
}

#[async_trait]
impl Responder for AssistantResponder {
    async fn generate(&self, prompt: &str) -> String {
        let Some(client) = &self.client else {
            return self.unavailable_reply.clone();
        };

        match client.complete(&self.system_prompt, prompt).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                tracing::warn!(provider = client.name(), "model returned an empty reply");
                self.fallback_reply.clone()
            }
            Err(e) => {
                tracing::warn!(provider = client.name(), error = %e, "model request failed");
                self.fallback_reply.clone()
            }
        }
    }
}

/// Build a shared HTTP client with the configured request timeout
fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(config.timeout).build()?)
}

fn require_key(key: &SecretString, provider: &str) -> Result<()> {
    use secrecy::ExposeSecret;

    if key.expose_secret().trim().is_empty() {
        return Err(crate::Error::Config(format!("{provider} API key is empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{DEFAULT_FALLBACK_REPLY, DEFAULT_SYSTEM_PROMPT, DEFAULT_UNAVAILABLE_REPLY};
    use crate::Error;

    struct Canned(Result<String>);

    #[async_trait]
    impl LlmClient for Canned {
        async fn complete(&self, system: &str, _prompt: &str) -> Result<String> {
            assert_eq!(system, DEFAULT_SYSTEM_PROMPT);
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::Llm(e.to_string())),
            }
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    fn config() -> LlmConfig {
        LlmConfig {
            provider: LlmProvider::Gemini,
            model: "gemini-1.5-flash".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            unavailable_reply: DEFAULT_UNAVAILABLE_REPLY.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    fn responder(reply: Result<String>) -> AssistantResponder {
        AssistantResponder::new(Some(Box::new(Canned(reply))), &config())
    }

    #[tokio::test]
    async fn test_reply_is_trimmed() {
        let reply = responder(Ok("  Hi there!\n".to_string())).generate("hello").await;
        assert_eq!(reply, "Hi there!");
    }

    #[tokio::test]
    async fn test_error_maps_to_fallback() {
        let reply = responder(Err(Error::Llm("503".to_string())))
            .generate("hello")
            .await;
        assert_eq!(reply, DEFAULT_FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_empty_reply_maps_to_fallback() {
        let reply = responder(Ok("   ".to_string())).generate("hello").await;
        assert_eq!(reply, DEFAULT_FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_no_client_is_unavailable() {
        let responder = AssistantResponder::new(None, &config());
        assert!(!responder.is_available());
        assert_eq!(responder.generate("hello").await, DEFAULT_UNAVAILABLE_REPLY);
    }

    #[test]
    fn test_from_config_without_key() {
        let responder = AssistantResponder::from_config(&config(), &ApiKeys::default()).unwrap();
        assert!(!responder.is_available());
    }

    #[test]
    fn test_from_config_picks_provider_key() {
        let keys = ApiKeys {
            openai: Some(SecretString::from("sk-test")),
            ..ApiKeys::default()
        };
        // Gemini selected, only an OpenAI key present
        assert!(!AssistantResponder::from_config(&config(), &keys).unwrap().is_available());

        let openai = LlmConfig {
            provider: LlmProvider::OpenAi,
            ..config()
        };
        assert!(AssistantResponder::from_config(&openai, &keys).unwrap().is_available());
    }
}
