//! Speech-to-text (STT) processing

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use super::http_client;
use crate::config::{ApiKeys, DEFAULT_VOICE_TIMEOUT, SttProvider, VoiceConfig};
use crate::{Error, Result};

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    provider: SttProvider,
}

impl std::fmt::Debug for SpeechToText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechToText")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl SpeechToText {
    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: SecretString, model: String) -> Result<Self> {
        Self::with_provider(SttProvider::Whisper, api_key, model)
    }

    /// Create a new STT instance using Deepgram
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_deepgram(api_key: SecretString, model: String) -> Result<Self> {
        Self::with_provider(SttProvider::Deepgram, api_key, model)
    }

    /// Build the configured provider, picking its key from `keys`
    ///
    /// # Errors
    ///
    /// Returns error if the provider's API key is not configured
    pub fn from_config(voice: &VoiceConfig, keys: &ApiKeys) -> Result<Self> {
        let key = match voice.stt_provider {
            SttProvider::Whisper => keys.openai.clone(),
            SttProvider::Deepgram => keys.deepgram.clone(),
        };
        let key = key.ok_or_else(|| missing_key(voice.stt_provider))?;
        Self::with_provider(voice.stt_provider, key, voice.stt_model.clone())?
            .with_request_timeout(voice.request_timeout)
    }

    /// Replace the per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = http_client(timeout)?;
        Ok(self)
    }

    fn with_provider(provider: SttProvider, api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(missing_key(provider));
        }

        Ok(Self {
            client: http_client(DEFAULT_VOICE_TIMEOUT)?,
            api_key,
            model,
            provider,
        })
    }

    #[must_use]
    pub const fn provider(&self) -> SttProvider {
        self.provider
    }

    /// Transcribe audio to text
    ///
    /// # Arguments
    ///
    /// * `audio` - WAV audio bytes
    /// * `language` - Optional ISO-639-1 hint for the recognizer
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    pub async fn transcribe(&self, audio: &[u8], language: Option<&str>) -> Result<String> {
        let transcript = match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio, language).await?,
            SttProvider::Deepgram => self.transcribe_deepgram(audio, language).await?,
        };
        Ok(transcript.trim().to_string())
    }

    /// Transcribe using OpenAI Whisper
    async fn transcribe_whisper(&self, audio: &[u8], language: Option<&str>) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());
        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(&self, audio: &[u8], language: Option<&str>) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let mut query = vec![("model", self.model.as_str()), ("punctuate", "true")];
        if let Some(lang) = language {
            query.push(("language", lang));
        }

        let response = self
            .client
            .post("https://api.deepgram.com/v1/listen")
            .query(&query)
            .header(
                "Authorization",
                format!("Token {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Deepgram response");
            e
        })?;

        let transcript = first_transcript(result);
        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

fn first_transcript(result: DeepgramResponse) -> String {
    result
        .results
        .channels
        .into_iter()
        .next()
        .and_then(|c| c.alternatives.into_iter().next())
        .map(|a| a.transcript)
        .unwrap_or_default()
}

fn missing_key(provider: SttProvider) -> Error {
    match provider {
        SttProvider::Whisper => Error::Config("OpenAI API key required for Whisper".to_string()),
        SttProvider::Deepgram => Error::Config("Deepgram API key required".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_matching_key() {
        let voice = VoiceConfig::default();
        let keys = ApiKeys {
            deepgram: Some(SecretString::from("dg-key")),
            ..ApiKeys::default()
        };

        // Whisper is the default and needs the OpenAI key
        let err = SpeechToText::from_config(&voice, &keys).unwrap_err();
        assert!(err.to_string().contains("OpenAI"));

        let deepgram = VoiceConfig {
            stt_provider: SttProvider::Deepgram,
            ..VoiceConfig::default()
        };
        let stt = SpeechToText::from_config(&deepgram, &keys).unwrap();
        assert_eq!(stt.provider(), SttProvider::Deepgram);
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(SpeechToText::new_whisper(SecretString::from("  "), "whisper-1".into()).is_err());
    }

    #[test]
    fn test_deepgram_transcript_extraction() {
        let json = r#"{"results":{"channels":[{"alternatives":[{"transcript":"hello there"}]}]}}"#;
        let parsed: DeepgramResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_transcript(parsed), "hello there");

        let empty: DeepgramResponse =
            serde_json::from_str(r#"{"results":{"channels":[]}}"#).unwrap();
        assert_eq!(first_transcript(empty), "");
    }
}
