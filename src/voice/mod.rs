//! Voice processing module
//!
//! Microphone capture with phrase detection, speech-to-text, text-to-speech
//! and speaker playback. [`MicrophoneTranscriber`] and [`VoiceSpeaker`] plug
//! these into a [`crate::Session`].

mod capture;
mod phrase;
mod playback;
mod resample;
mod speaker;
mod stt;
mod transcriber;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, record_phrase, samples_to_wav};
pub use phrase::{PhraseDetector, PhraseState, calculate_energy};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3};
pub use resample::resample_mono;
pub use speaker::VoiceSpeaker;
pub use stt::SpeechToText;
pub use transcriber::MicrophoneTranscriber;
pub use tts::{GOOGLE_MAX_CHARS, TextToSpeech, split_for_google};

use std::time::Duration;

/// Build an HTTP client whose requests give up after `timeout`
fn http_client(timeout: Duration) -> crate::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}
