//! Configuration management for Parley
//!
//! Every setting resolves as env > toml > default.

pub mod file;
mod messages;

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

pub use file::{ParleyConfigFile, config_file_path, load_config_file, load_config_file_from};
pub use messages::{LocalizedMessage, MessageCatalog, MessageKey};

use crate::{Error, Result};

/// Default system instruction for the language model
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly voice assistant. \
Keep your responses concise, simple, and helpful. \
Use simple language that anyone can understand.";

/// Reply spoken when the model call fails
pub const DEFAULT_FALLBACK_REPLY: &str = "I didn't understand that. Can you try again?";

/// Reply spoken when no model is configured
pub const DEFAULT_UNAVAILABLE_REPLY: &str = "I'm having trouble thinking right now.";

/// Upper bound on any single listening window
pub const MAX_LISTEN_WINDOW: Duration = Duration::from_secs(600);

/// Default timeout for speech provider requests
pub const DEFAULT_VOICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Parley configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Language model configuration
    pub llm: LlmConfig,

    /// Microphone listening configuration
    pub listen: ListenConfig,

    /// Speech provider configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// User-facing messages and their languages
    pub messages: MessageCatalog,
}

/// Hosted language model backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Google Gemini `generateContent`
    #[default]
    Gemini,
    /// `OpenAI` chat completions
    OpenAi,
}

impl FromStr for LlmProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!("unknown LLM provider: {other}"))),
        }
    }
}

/// Speech-to-text backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SttProvider {
    /// `OpenAI` Whisper
    #[default]
    Whisper,
    /// Deepgram
    Deepgram,
}

impl FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Text-to-speech backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsProvider {
    /// Google Translate speech, keyless and language-tagged
    #[default]
    Google,
    /// `OpenAI` speech
    OpenAi,
    /// `ElevenLabs`
    ElevenLabs,
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" | "gtts" => Ok(Self::Google),
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Backend provider
    pub provider: LlmProvider,

    /// Model identifier
    pub model: String,

    /// System instruction prepended to every prompt
    pub system_prompt: String,

    /// Reply used when the model call fails
    pub fallback_reply: String,

    /// Reply used when no model is configured
    pub unavailable_reply: String,

    /// Request timeout
    pub timeout: Duration,
}

/// Microphone listening configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenConfig {
    /// Ambient noise sampled before listening
    pub calibration: Duration,

    /// How long to wait for speech to start
    pub timeout: Duration,

    /// Maximum phrase duration once speech has started
    pub phrase_limit: Duration,

    /// Trailing silence that ends a phrase
    pub pause: Duration,

    /// Lowest RMS energy considered speech
    pub min_energy: f32,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            calibration: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(10),
            pause: Duration::from_millis(800),
            min_energy: 0.01,
        }
    }
}

/// Speech provider configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT backend
    pub stt_provider: SttProvider,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS backend
    pub tts_provider: TtsProvider,

    /// TTS model (e.g. "tts-1", "eleven_multilingual_v2")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// Timeout for each STT or TTS request
    pub request_timeout: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_provider: SttProvider::Whisper,
            stt_model: "whisper-1".to_string(),
            tts_provider: TtsProvider::Google,
            tts_model: String::new(),
            tts_voice: String::new(),
            tts_speed: 1.0,
            request_timeout: DEFAULT_VOICE_TIMEOUT,
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Google Gemini API key
    pub gemini: Option<SecretString>,

    /// `OpenAI` API key (Whisper, TTS, chat)
    pub openai: Option<SecretString>,

    /// Deepgram API key (optional STT)
    pub deepgram: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,
}

impl Config {
    /// Load configuration from the environment and the standard config file
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn load() -> Result<Self> {
        Self::resolve(load_config_file(), |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn resolve(fc: ParleyConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = |var: &str, toml: Option<String>| {
            env(var)
                .or(toml)
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from)
        };

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            gemini: secret("GEMINI_API_KEY", fc.api_keys.gemini),
            openai: secret("OPENAI_API_KEY", fc.api_keys.openai),
            deepgram: secret("DEEPGRAM_API_KEY", fc.api_keys.deepgram),
            elevenlabs: secret("ELEVENLABS_API_KEY", fc.api_keys.elevenlabs),
        };

        // LLM config (env > toml > default)
        let provider: LlmProvider = env("PARLEY_LLM_PROVIDER")
            .or(fc.llm.provider)
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or_default();
        let default_model = match provider {
            LlmProvider::Gemini => "gemini-1.5-flash",
            LlmProvider::OpenAi => "gpt-4o-mini",
        };
        let llm = LlmConfig {
            provider,
            model: env("PARLEY_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| default_model.to_string()),
            system_prompt: fc
                .llm
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            fallback_reply: fc
                .llm
                .fallback_reply
                .unwrap_or_else(|| DEFAULT_FALLBACK_REPLY.to_string()),
            unavailable_reply: fc
                .llm
                .unavailable_reply
                .unwrap_or_else(|| DEFAULT_UNAVAILABLE_REPLY.to_string()),
            timeout: Duration::from_secs(fc.llm.timeout_secs.unwrap_or(30)),
        };

        // Listen config (env > toml > default)
        let defaults = ListenConfig::default();
        let listen = ListenConfig {
            calibration: fc
                .listen
                .calibration_ms
                .map_or(defaults.calibration, Duration::from_millis)
                .min(MAX_LISTEN_WINDOW),
            timeout: env("PARLEY_LISTEN_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .or(fc.listen.timeout_secs)
                .and_then(secs_f32)
                .unwrap_or(defaults.timeout),
            phrase_limit: env("PARLEY_PHRASE_LIMIT")
                .and_then(|s| s.parse().ok())
                .or(fc.listen.phrase_limit_secs)
                .and_then(secs_f32)
                .unwrap_or(defaults.phrase_limit),
            pause: fc
                .listen
                .pause_ms
                .map_or(defaults.pause, Duration::from_millis)
                .min(MAX_LISTEN_WINDOW),
            min_energy: fc.listen.min_energy.unwrap_or(defaults.min_energy),
        };

        // Voice config (env > toml > default)
        let stt_provider: SttProvider = env("PARLEY_STT_PROVIDER")
            .or(fc.voice.stt_provider)
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or_default();
        let tts_provider: TtsProvider = env("PARLEY_TTS_PROVIDER")
            .or(fc.voice.tts_provider)
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or_default();
        let default_stt_model = match stt_provider {
            SttProvider::Whisper => "whisper-1",
            SttProvider::Deepgram => "nova-2",
        };
        let (default_tts_model, default_tts_voice) = match tts_provider {
            TtsProvider::Google => ("", ""),
            TtsProvider::OpenAi => ("tts-1", "alloy"),
            TtsProvider::ElevenLabs => ("eleven_multilingual_v2", "21m00Tcm4TlvDq8ikWAM"),
        };
        let voice = VoiceConfig {
            stt_provider,
            stt_model: env("PARLEY_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| default_stt_model.to_string()),
            tts_provider,
            tts_model: env("PARLEY_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| default_tts_model.to_string()),
            tts_voice: env("PARLEY_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| default_tts_voice.to_string()),
            tts_speed: fc.voice.tts_speed.unwrap_or(1.0).clamp(0.25, 4.0),
            request_timeout: fc
                .voice
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map_or(DEFAULT_VOICE_TIMEOUT, Duration::from_secs),
        };

        // Message catalog (toml > default)
        let mut messages = MessageCatalog::default();
        if let Some(lang) = env("PARLEY_PRIMARY_LANG").or(fc.messages.primary_lang) {
            messages.primary_lang = lang;
        }
        if let Some(lang) = env("PARLEY_SECONDARY_LANG").or(fc.messages.secondary_lang) {
            messages.secondary_lang = lang;
        }
        let overrides = [
            (MessageKey::Listening, fc.messages.listening),
            (MessageKey::Thinking, fc.messages.thinking),
            (MessageKey::Speaking, fc.messages.speaking),
            (MessageKey::Welcome, fc.messages.welcome),
        ];
        for (key, entry) in overrides
            .into_iter()
            .filter_map(|(key, entry)| entry.map(|e| (key, e)))
        {
            let current = messages.get(key).clone();
            messages.set(
                key,
                LocalizedMessage {
                    primary: entry.primary.unwrap_or(current.primary),
                    secondary: entry.secondary.unwrap_or(current.secondary),
                },
            );
        }

        Ok(Self {
            llm,
            listen,
            voice,
            api_keys,
            messages,
        })
    }
}

/// Convert a positive float of seconds into a duration of at most [`MAX_LISTEN_WINDOW`]
fn secs_f32(secs: f32) -> Option<Duration> {
    if secs <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f32(secs)
        .ok()
        .map(|d| d.min(MAX_LISTEN_WINDOW))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::file::{MessageFileEntry, MessagesFileConfig};
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = Config::resolve(ParleyConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.llm.fallback_reply, DEFAULT_FALLBACK_REPLY);
        assert_eq!(config.listen.timeout, Duration::from_secs(5));
        assert_eq!(config.listen.phrase_limit, Duration::from_secs(10));
        assert_eq!(config.voice.tts_provider, TtsProvider::Google);
        assert_eq!(config.messages.primary_lang, "en");
        assert_eq!(config.messages.secondary_lang, "hi");
        assert!(config.api_keys.gemini.is_none());
    }

    #[test]
    fn test_env_overrides_toml() {
        let mut fc = ParleyConfigFile::default();
        fc.llm.model = Some("from-toml".to_string());
        fc.api_keys.gemini = Some("toml-key".to_string());

        let config = Config::resolve(
            fc,
            env_from(&[("PARLEY_LLM_MODEL", "from-env"), ("GEMINI_API_KEY", "env-key")]),
        )
        .unwrap();

        assert_eq!(config.llm.model, "from-env");
        assert_eq!(
            config.api_keys.gemini.as_ref().map(|k| k.expose_secret()),
            Some("env-key")
        );
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let config =
            Config::resolve(ParleyConfigFile::default(), env_from(&[("OPENAI_API_KEY", "  ")]))
                .unwrap();
        assert!(config.api_keys.openai.is_none());
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let err = Config::resolve(
            ParleyConfigFile::default(),
            env_from(&[("PARLEY_TTS_PROVIDER", "festival")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_provider_changes_model_defaults() {
        let config = Config::resolve(
            ParleyConfigFile::default(),
            env_from(&[
                ("PARLEY_LLM_PROVIDER", "openai"),
                ("PARLEY_TTS_PROVIDER", "OpenAI"),
            ]),
        )
        .unwrap();

        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.voice.tts_model, "tts-1");
        assert_eq!(config.voice.tts_voice, "alloy");
    }

    #[test]
    fn test_message_override_keeps_missing_half() {
        let fc = ParleyConfigFile {
            messages: MessagesFileConfig {
                secondary_lang: Some("es".to_string()),
                welcome: Some(MessageFileEntry {
                    primary: None,
                    secondary: Some("¡Hola!".to_string()),
                }),
                ..MessagesFileConfig::default()
            },
            ..ParleyConfigFile::default()
        };

        let config = Config::resolve(fc, env_from(&[])).unwrap();
        let welcome = config.messages.get(MessageKey::Welcome);

        assert_eq!(config.messages.secondary_lang, "es");
        assert_eq!(welcome.secondary, "¡Hola!");
        assert_eq!(
            welcome.primary,
            MessageCatalog::default().get(MessageKey::Welcome).primary
        );
    }

    #[test]
    fn test_invalid_listen_timeout_falls_back() {
        let config = Config::resolve(
            ParleyConfigFile::default(),
            env_from(&[("PARLEY_LISTEN_TIMEOUT", "-2")]),
        )
        .unwrap();
        assert_eq!(config.listen.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_oversized_listen_window_is_bounded() {
        let config = Config::resolve(
            ParleyConfigFile::default(),
            env_from(&[
                ("PARLEY_LISTEN_TIMEOUT", "1e20"),
                ("PARLEY_PHRASE_LIMIT", "1e10"),
            ]),
        )
        .unwrap();
        // Not representable as a duration at all
        assert_eq!(config.listen.timeout, Duration::from_secs(5));
        assert_eq!(config.listen.phrase_limit, MAX_LISTEN_WINDOW);

        let fc = ParleyConfigFile {
            listen: super::file::ListenFileConfig {
                calibration_ms: Some(u64::MAX),
                pause_ms: Some(u64::MAX),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = Config::resolve(fc, |_| None).unwrap();
        assert_eq!(config.listen.calibration, MAX_LISTEN_WINDOW);
        assert_eq!(config.listen.pause, MAX_LISTEN_WINDOW);
    }

    #[test]
    fn test_voice_request_timeout() {
        let config = Config::resolve(ParleyConfigFile::default(), |_| None).unwrap();
        assert_eq!(config.voice.request_timeout, DEFAULT_VOICE_TIMEOUT);

        let fc = ParleyConfigFile {
            voice: super::file::VoiceFileConfig {
                request_timeout_secs: Some(12),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = Config::resolve(fc, |_| None).unwrap();
        assert_eq!(config.voice.request_timeout, Duration::from_secs(12));
    }
}
