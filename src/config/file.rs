//! TOML configuration file loading
//!
//! Supports `~/.config/parley/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ParleyConfigFile {
    /// Language model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Microphone listening configuration
    #[serde(default)]
    pub listen: ListenFileConfig,

    /// Speech provider configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Message catalog overrides
    #[serde(default)]
    pub messages: MessagesFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Provider ("gemini" or "openai")
    pub provider: Option<String>,

    /// Model identifier (e.g. "gemini-1.5-flash")
    pub model: Option<String>,

    /// System instruction sent with every prompt
    pub system_prompt: Option<String>,

    /// Reply used when the model call fails
    pub fallback_reply: Option<String>,

    /// Reply used when no model is configured
    pub unavailable_reply: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Listening configuration
#[derive(Debug, Default, Deserialize)]
pub struct ListenFileConfig {
    /// Ambient noise calibration window in milliseconds
    pub calibration_ms: Option<u64>,

    /// Seconds to wait for speech to start
    pub timeout_secs: Option<f32>,

    /// Maximum phrase duration in seconds
    pub phrase_limit_secs: Option<f32>,

    /// Trailing silence that ends a phrase, in milliseconds
    pub pause_ms: Option<u64>,

    /// Lowest RMS energy considered speech
    pub min_energy: Option<f32>,
}

/// Speech provider configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS provider ("google", "openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// Per-request timeout for STT and TTS, in seconds
    pub request_timeout_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub gemini: Option<String>,
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Message catalog overrides
#[derive(Debug, Default, Deserialize)]
pub struct MessagesFileConfig {
    /// Primary language tag
    pub primary_lang: Option<String>,

    /// Secondary language tag
    pub secondary_lang: Option<String>,

    pub listening: Option<MessageFileEntry>,
    pub thinking: Option<MessageFileEntry>,
    pub speaking: Option<MessageFileEntry>,
    pub welcome: Option<MessageFileEntry>,
}

/// A single message override; missing halves keep the default
#[derive(Debug, Default, Deserialize)]
pub struct MessageFileEntry {
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ParleyConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> ParleyConfigFile {
    config_file_path().map_or_else(ParleyConfigFile::default, |path| load_config_file_from(&path))
}

/// Load the TOML config file from an explicit path
///
/// Returns `ParleyConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file_from(path: &Path) -> ParleyConfigFile {
    if !path.exists() {
        return ParleyConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ParleyConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ParleyConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/parley/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("parley").join("config.toml"))
}
