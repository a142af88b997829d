//! External collaborators driven by a session
//!
//! The session only sees these traits. Concrete implementations live in
//! [`crate::voice`] and [`crate::llm`]; tests script their own.

use async_trait::async_trait;

use crate::Result;

/// Captures one utterance from the user and returns its text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Block until a phrase has been heard and recognized
    ///
    /// An empty string means nothing intelligible was heard.
    ///
    /// # Errors
    ///
    /// Returns error on listen timeout, device failure, or recognition failure
    async fn capture(&self) -> Result<String>;
}

/// Produces the assistant's reply to a prompt
///
/// Implementations never fail: internal errors are mapped to a fixed
/// fallback reply.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply for `prompt`
    async fn generate(&self, prompt: &str) -> String;
}

/// Speaks text aloud on the audio output
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Synthesize `text` in language `lang` and block until playback ends
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str, lang: &str) -> Result<()>;
}
