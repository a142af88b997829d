//! Parley - a push-to-talk voice assistant
//!
//! This library provides the building blocks of a spoken conversation:
//! - An interaction state machine that runs listen → think → speak turns
//! - Microphone capture with phrase detection and hosted speech-to-text
//! - Hosted language models with a never-failing responder
//! - Text-to-speech and speaker playback
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Presentation                       │
//! │        Console  (watch::Receiver<SessionSnapshot>)  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Session                          │
//! │   State  │  Processing lock  │  Conversation        │
//! └──────┬──────────────┬─────────────────┬─────────────┘
//!        │              │                 │
//! ┌──────▼──────┐ ┌─────▼──────┐ ┌────────▼────────┐
//! │ Transcriber │ │ Responder  │ │     Speaker     │
//! │ mic + STT   │ │ Gemini/OAI │ │   TTS + audio   │
//! └─────────────┘ └────────────┘ └─────────────────┘
//! ```

pub mod config;
pub mod console;
pub mod error;
pub mod llm;
pub mod session;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use llm::{AssistantResponder, LlmClient};
pub use session::{
    Conversation, InteractionState, Responder, Role, Session, SessionSnapshot, Speaker,
    StatusLine, Transcriber, Turn, TurnOutcome, WelcomeOutcome,
};
pub use voice::{MicrophoneTranscriber, VoiceSpeaker};
