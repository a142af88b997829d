//! Bilingual message catalog
//!
//! Maps each user-facing message key to a primary-language string and its
//! secondary-language translation. Defaults are English and Hindi.

use std::fmt;

/// Keys of the user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Shown while the microphone is open
    Listening,
    /// Shown while waiting for the language model
    Thinking,
    /// Shown while the reply is being played
    Speaking,
    /// Spoken and shown once at session start
    Welcome,
}

impl MessageKey {
    /// All keys, in catalog order
    pub const ALL: [Self; 4] = [Self::Listening, Self::Thinking, Self::Speaking, Self::Welcome];

    /// Stable lowercase name, used as the TOML key
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
            Self::Welcome => "welcome",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in both catalog languages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedMessage {
    /// Text in the primary language
    pub primary: String,
    /// Text in the secondary language
    pub secondary: String,
}

impl LocalizedMessage {
    /// Create a message from both translations
    #[must_use]
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }
}

/// Message strings and the language tags they are spoken in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCatalog {
    /// Language tag of the primary strings (e.g. "en")
    pub primary_lang: String,
    /// Language tag of the secondary strings (e.g. "hi")
    pub secondary_lang: String,
    listening: LocalizedMessage,
    thinking: LocalizedMessage,
    speaking: LocalizedMessage,
    welcome: LocalizedMessage,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            primary_lang: "en".to_string(),
            secondary_lang: "hi".to_string(),
            listening: LocalizedMessage::new("Listening...", "सुन रहा हूँ..."),
            thinking: LocalizedMessage::new("Thinking...", "सोच रहा हूँ..."),
            speaking: LocalizedMessage::new("Speaking...", "बोल रहा हूँ..."),
            welcome: LocalizedMessage::new(
                "Hello! Tap the microphone button and speak to ask me a question.",
                "नमस्ते! मुझसे बात करने के लिए माइक्रोफोन बटन पर टैप करें।",
            ),
        }
    }
}

impl MessageCatalog {
    /// Look up a message by key
    #[must_use]
    pub const fn get(&self, key: MessageKey) -> &LocalizedMessage {
        match key {
            MessageKey::Listening => &self.listening,
            MessageKey::Thinking => &self.thinking,
            MessageKey::Speaking => &self.speaking,
            MessageKey::Welcome => &self.welcome,
        }
    }

    /// Replace a message
    pub fn set(&mut self, key: MessageKey, message: LocalizedMessage) {
        let slot = match key {
            MessageKey::Listening => &mut self.listening,
            MessageKey::Thinking => &mut self.thinking,
            MessageKey::Speaking => &mut self.speaking,
            MessageKey::Welcome => &mut self.welcome,
        };
        *slot = message;
    }

    /// Builder-style variant of [`Self::set`]
    #[must_use]
    pub fn with(mut self, key: MessageKey, message: LocalizedMessage) -> Self {
        self.set(key, message);
        self
    }
}
