//! Speaker-backed [`Speaker`]

use async_trait::async_trait;

use super::playback::AudioPlayback;
use super::tts::TextToSpeech;
use crate::session::Speaker;
use crate::{Error, Result};

/// Synthesizes speech and plays it on the default output device
#[derive(Debug)]
pub struct VoiceSpeaker {
    tts: TextToSpeech,
}

impl VoiceSpeaker {
    #[must_use]
    pub const fn new(tts: TextToSpeech) -> Self {
        Self { tts }
    }
}

#[async_trait]
impl Speaker for VoiceSpeaker {
    async fn speak(&self, text: &str, lang: &str) -> Result<()> {
        let audio = self.tts.synthesize(text, lang).await?;

        // Output streams are not Send; open the device on the blocking thread
        tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3(&audio))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}
