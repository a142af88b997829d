//! Session data model: turns, conversation, interaction state, snapshots

use std::fmt;

use chrono::{DateTime, Utc};

use crate::config::LocalizedMessage;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The person speaking to the assistant
    User,
    /// The assistant
    Assistant,
}

impl Role {
    /// Lowercase role name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One utterance in the conversation; immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    text: String,
    at: DateTime<Utc>,
}

impl Turn {
    /// Create a turn stamped with the current time
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// Create a user turn
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant turn
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// When the turn was recorded
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        self.at
    }
}

/// Append-only sequence of turns for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create an empty conversation
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent turn, if any
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// All turns in order
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Iterate over turns in order
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// `(role, text)` pairs, convenient for assertions and display
    #[must_use]
    pub fn pairs(&self) -> Vec<(Role, &str)> {
        self.turns.iter().map(|t| (t.role, t.text.as_str())).collect()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Phase of the voice pipeline, mirrored to the presentation layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InteractionState {
    /// Waiting for the user to start a turn
    #[default]
    Idle,
    /// Microphone open
    Listening,
    /// Waiting for the reply
    Thinking,
    /// Reply being played
    Speaking,
}

impl InteractionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
        }
    }

    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bilingual status text shown under the animation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub primary: String,
    pub secondary: String,
}

impl StatusLine {
    /// A status line with no text
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            primary: String::new(),
            secondary: String::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }
}

impl From<&LocalizedMessage> for StatusLine {
    fn from(msg: &LocalizedMessage) -> Self {
        Self {
            primary: msg.primary.clone(),
            secondary: msg.secondary.clone(),
        }
    }
}

/// Point-in-time view of a session for observers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current pipeline phase
    pub state: InteractionState,
    /// Whether a turn (or the welcome) is in flight
    pub is_processing: bool,
    /// Text of the most recent turn
    pub last_text: Option<String>,
    /// Who produced the most recent turn
    pub last_role: Option<Role>,
    /// Status line for the current phase
    pub status: StatusLine,
    /// Number of turns in the conversation
    pub turns: usize,
}

/// Result of one call to `process_voice_turn`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Another turn was already in flight; nothing happened
    Busy,
    /// Nothing was transcribed; the conversation is unchanged
    NoSpeech,
    /// The reply was spoken
    Completed { transcript: String, reply: String },
    /// The reply was recorded but could not be played
    PlaybackFailed { transcript: String, reply: String },
}

impl TurnOutcome {
    /// Number of turns this outcome appended to the conversation
    #[must_use]
    pub const fn turns_added(&self) -> usize {
        match self {
            Self::Busy | Self::NoSpeech => 0,
            Self::Completed { .. } | Self::PlaybackFailed { .. } => 2,
        }
    }
}

/// Result of one call to `play_welcome_once`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WelcomeOutcome {
    /// The welcome was recorded and played
    Played,
    /// The welcome had already been played this session
    AlreadyWelcomed,
    /// A turn was in flight; the welcome is still pending
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_keeps_order() {
        let mut conversation = Conversation::new();
        conversation.push(Turn::user("hi"));
        conversation.push(Turn::assistant("hello"));

        assert_eq!(conversation.len(), 2);
        assert_eq!(
            conversation.pairs(),
            vec![(Role::User, "hi"), (Role::Assistant, "hello")]
        );
        assert_eq!(conversation.last().map(Turn::text), Some("hello"));
    }

    #[test]
    fn test_turn_timestamps_are_monotonic() {
        let first = Turn::user("a");
        let second = Turn::assistant("b");
        assert!(second.at() >= first.at());
    }

    #[test]
    fn test_turns_added() {
        assert_eq!(TurnOutcome::Busy.turns_added(), 0);
        assert_eq!(TurnOutcome::NoSpeech.turns_added(), 0);
        let done = TurnOutcome::Completed {
            transcript: "q".to_string(),
            reply: "a".to_string(),
        };
        assert_eq!(done.turns_added(), 2);
    }

    #[test]
    fn test_status_line_from_message() {
        let msg = LocalizedMessage::new("Listening...", "सुन रहा हूँ...");
        let status = StatusLine::from(&msg);
        assert!(!status.is_empty());
        assert!(StatusLine::empty().is_empty());
    }
}
