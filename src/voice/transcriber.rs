//! Microphone-backed [`Transcriber`]

use async_trait::async_trait;

use super::capture::{SAMPLE_RATE, record_phrase, samples_to_wav};
use super::stt::SpeechToText;
use crate::config::ListenConfig;
use crate::session::Transcriber;
use crate::{Error, Result};

/// Records one phrase from the default microphone and sends it to STT
#[derive(Debug)]
pub struct MicrophoneTranscriber {
    stt: SpeechToText,
    listen: ListenConfig,
    language: Option<String>,
}

impl MicrophoneTranscriber {
    #[must_use]
    pub const fn new(stt: SpeechToText, listen: ListenConfig) -> Self {
        Self {
            stt,
            listen,
            language: None,
        }
    }

    /// Hint the recognizer toward `lang` (ISO-639-1)
    #[must_use]
    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }
}

#[async_trait]
impl Transcriber for MicrophoneTranscriber {
    async fn capture(&self) -> Result<String> {
        let listen = self.listen;
        let samples = tokio::task::spawn_blocking(move || record_phrase(&listen))
            .await
            .map_err(|e| Error::Audio(format!("capture task failed: {e}")))??;

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        self.stt.transcribe(&wav, self.language.as_deref()).await
    }
}
