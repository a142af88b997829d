//! Text-to-speech (TTS) processing

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use super::http_client;
use crate::config::{ApiKeys, DEFAULT_VOICE_TIMEOUT, TtsProvider, VoiceConfig};
use crate::{Error, Result};

/// Longest text the Google Translate endpoint accepts per request
pub const GOOGLE_MAX_CHARS: usize = 100;

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    voice: String,
    speed: f32,
    model: String,
    provider: TtsProvider,
}

impl std::fmt::Debug for TextToSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextToSpeech")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .finish_non_exhaustive()
    }
}

impl TextToSpeech {
    /// Create a keyless TTS instance backed by Google Translate speech
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new_google() -> Result<Self> {
        Ok(Self {
            client: http_client(DEFAULT_VOICE_TIMEOUT)?,
            api_key: None,
            voice: String::new(),
            speed: 1.0,
            model: String::new(),
            provider: TtsProvider::Google,
        })
    }

    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(
        api_key: SecretString,
        voice: String,
        speed: f32,
        model: String,
    ) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: http_client(DEFAULT_VOICE_TIMEOUT)?,
            api_key: Some(api_key),
            voice,
            speed,
            model,
            provider: TtsProvider::OpenAi,
        })
    }

    /// Create a new TTS instance using `ElevenLabs`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(api_key: SecretString, voice_id: String, model: String) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: http_client(DEFAULT_VOICE_TIMEOUT)?,
            api_key: Some(api_key),
            voice: voice_id,
            speed: 1.0, // ElevenLabs doesn't use speed in the same way
            model,
            provider: TtsProvider::ElevenLabs,
        })
    }

    /// Build the configured provider, picking its key from `keys`
    ///
    /// # Errors
    ///
    /// Returns error if a keyed provider has no API key configured
    pub fn from_config(voice: &VoiceConfig, keys: &ApiKeys) -> Result<Self> {
        let tts = match voice.tts_provider {
            TtsProvider::Google => Self::new_google(),
            TtsProvider::OpenAi => {
                let key = keys.openai.clone().ok_or_else(|| {
                    Error::Config("OpenAI API key required for TTS".to_string())
                })?;
                Self::new_openai(
                    key,
                    voice.tts_voice.clone(),
                    voice.tts_speed,
                    voice.tts_model.clone(),
                )
            }
            TtsProvider::ElevenLabs => {
                let key = keys.elevenlabs.clone().ok_or_else(|| {
                    Error::Config("ElevenLabs API key required for TTS".to_string())
                })?;
                Self::new_elevenlabs(key, voice.tts_voice.clone(), voice.tts_model.clone())
            }
        }?;
        tts.with_request_timeout(voice.request_timeout)
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

    #[must_use]
    pub const fn provider(&self) -> TtsProvider {
        self.provider
    }

    /// Synthesize text to speech
    ///
    /// # Arguments
    ///
    /// * `text` - Text to synthesize
    /// * `lang` - Language tag; only Google honors it, the others infer language from text
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(Error::Tts("nothing to synthesize".to_string()));
        }

        tracing::debug!(
            provider = ?self.provider,
            lang,
            chars = text.chars().count(),
            "synthesizing"
        );

        match self.provider {
            TtsProvider::Google => self.synthesize_google(text, lang).await,
            TtsProvider::OpenAi => self.synthesize_openai(text).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text).await,
        }
    }

    /// Synthesize using Google Translate speech
    ///
    /// The endpoint caps input length, so the text is split and the MP3
    /// responses are concatenated. MP3 frames decode fine back to back.
    async fn synthesize_google(&self, text: &str, lang: &str) -> Result<Vec<u8>> {
        let chunks = split_for_google(text, GOOGLE_MAX_CHARS);
        let total = chunks.len();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let url = format!(
                "https://translate.google.com/translate_tts?ie=UTF-8&q={}&tl={}&total={total}&idx={idx}&textlen={}&client=tw-ob",
                urlencoding::encode(chunk),
                urlencoding::encode(lang),
                chunk.chars().count(),
            );

            let response = self
                .client
                .get(&url)
                .header("User-Agent", "Mozilla/5.0")
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Tts(format!("Google TTS error {status}: {body}")));
            }

            audio.extend_from_slice(&response.bytes().await?);
        }

        tracing::debug!(chunks = total, bytes = audio.len(), "Google TTS complete");
        Ok(audio)
    }

    /// Synthesize using OpenAI TTS
    async fn synthesize_openai(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(self.key()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    /// Synthesize using ElevenLabs TTS
    async fn synthesize_elevenlabs(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            urlencoding::encode(&self.voice)
        );

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.key()?)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| Error::Config("TTS API key missing".to_string()))
    }
}

/// Split `text` into pieces of at most `max_chars` characters
///
/// Breaks on whitespace; a single word longer than the limit is cut on
/// character boundaries.
#[must_use]
pub fn split_for_google(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            chunks.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
