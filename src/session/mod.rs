//! Interaction state machine
//!
//! A [`Session`] owns the conversation, the interaction state, and the
//! processing lock. Each call to [`Session::process_voice_turn`] runs one
//! full listen → think → speak pipeline against the collaborators; at most
//! one pipeline is in flight at a time.
//!
//! ```text
//!          capture ok           reply ready          playback done
//!  Idle ──▶ Listening ──────▶ Thinking ──────▶ Speaking ──────▶ Idle
//!              │
//!              └── no speech / failure ──▶ Idle
//! ```
//!
//! Presentation layers observe the session through [`Session::subscribe`].

mod collaborators;
mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::Instrument as _;
use uuid::Uuid;

pub use collaborators::{Responder, Speaker, Transcriber};
pub use types::{
    Conversation, InteractionState, Role, SessionSnapshot, StatusLine, Turn, TurnOutcome,
    WelcomeOutcome,
};

use crate::config::{MessageCatalog, MessageKey};

/// One voice conversation with its collaborators and history
pub struct Session {
    id: Uuid,
    transcriber: Box<dyn Transcriber>,
    responder: Box<dyn Responder>,
    speaker: Box<dyn Speaker>,
    messages: MessageCatalog,
    processing: AtomicBool,
    welcomed: AtomicBool,
    conversation: Mutex<Conversation>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl Session {
    /// Start a new session with an empty conversation
    #[must_use]
    pub fn new(
        transcriber: impl Transcriber + 'static,
        responder: impl Responder + 'static,
        speaker: impl Speaker + 'static,
        messages: MessageCatalog,
    ) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session = %id, "session started");

        Self {
            id,
            transcriber: Box::new(transcriber),
            responder: Box::new(responder),
            speaker: Box::new(speaker),
            messages,
            processing: AtomicBool::new(false),
            welcomed: AtomicBool::new(false),
            conversation: Mutex::new(Conversation::new()),
            snapshot: watch::Sender::new(SessionSnapshot::default()),
        }
    }

    /// Session identifier, recorded on every log line of its turns
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The message catalog this session speaks and displays
    #[must_use]
    pub const fn messages(&self) -> &MessageCatalog {
        &self.messages
    }

    /// Current pipeline phase
    #[must_use]
    pub fn state(&self) -> InteractionState {
        self.snapshot.borrow().state
    }

    /// Whether a turn or the welcome is in flight
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Whether the welcome has been played
    #[must_use]
    pub fn is_welcomed(&self) -> bool {
        self.welcomed.load(Ordering::Acquire)
    }

    /// Copy of the conversation so far
    #[must_use]
    pub fn conversation(&self) -> Conversation {
        self.lock_conversation().clone()
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Observe every state, status and conversation change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Run one voice turn: listen, transcribe, reply, speak
    ///
    /// Returns [`TurnOutcome::Busy`] without touching any state when another
    /// turn is already in flight.
    pub async fn process_voice_turn(&self) -> TurnOutcome {
        let Some(_guard) = ProcessingGuard::acquire(self) else {
            tracing::debug!(session = %self.id, "turn already in progress, ignoring trigger");
            return TurnOutcome::Busy;
        };

        let span = tracing::info_span!("turn", session = %self.id);
        self.run_turn().instrument(span).await
    }

    async fn run_turn(&self) -> TurnOutcome {
        self.enter(InteractionState::Listening, Some(MessageKey::Listening));

        let transcript = match self.transcriber.capture().await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::info!("nothing heard");
                self.enter(InteractionState::Idle, None);
                return TurnOutcome::NoSpeech;
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                self.enter(InteractionState::Idle, None);
                return TurnOutcome::NoSpeech;
            }
        };

        tracing::info!(transcript = %transcript, "user spoke");
        self.append(Turn::user(transcript.clone()));

        self.enter(InteractionState::Thinking, Some(MessageKey::Thinking));
        let reply = self.responder.generate(&transcript).await;
        tracing::debug!(reply_len = reply.len(), "reply ready");
        self.append(Turn::assistant(reply.clone()));

        self.enter(InteractionState::Speaking, Some(MessageKey::Speaking));
        let outcome = match self.speaker.speak(&reply, &self.messages.primary_lang).await {
            Ok(()) => TurnOutcome::Completed { transcript, reply },
            Err(e) => {
                tracing::warn!(error = %e, "playback failed");
                TurnOutcome::PlaybackFailed { transcript, reply }
            }
        };

        self.enter(InteractionState::Idle, None);
        outcome
    }

    /// Record and speak the welcome message, once per session
    ///
    /// The welcome is spoken in the primary language, then its translation
    /// in the secondary language. If a turn is in flight the welcome is left
    /// pending and [`WelcomeOutcome::Busy`] is returned.
    pub async fn play_welcome_once(&self) -> WelcomeOutcome {
        if self.is_welcomed() {
            return WelcomeOutcome::AlreadyWelcomed;
        }

        let Some(_guard) = ProcessingGuard::acquire(self) else {
            return WelcomeOutcome::Busy;
        };

        if self.welcomed.swap(true, Ordering::AcqRel) {
            return WelcomeOutcome::AlreadyWelcomed;
        }

        let span = tracing::info_span!("welcome", session = %self.id);
        async {
            let welcome = self.messages.get(MessageKey::Welcome).clone();
            self.append(Turn::assistant(welcome.primary.clone()));
            self.enter(InteractionState::Speaking, Some(MessageKey::Welcome));

            let spoken = async {
                self.speaker
                    .speak(&welcome.primary, &self.messages.primary_lang)
                    .await?;
                self.speaker
                    .speak(&welcome.secondary, &self.messages.secondary_lang)
                    .await
            };
            if let Err(e) = spoken.await {
                tracing::warn!(error = %e, "welcome playback failed");
            }

            // The welcome status stays up until the first turn starts
            self.snapshot.send_modify(|s| s.state = InteractionState::Idle);
            tracing::info!("welcome played");
        }
        .instrument(span)
        .await;

        WelcomeOutcome::Played
    }

    /// End the session and hand back its conversation
    #[must_use]
    pub fn end(self) -> Conversation {
        let conversation = self
            .conversation
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        tracing::info!(session = %self.id, turns = conversation.len(), "session ended");
        conversation
    }

    /// Move to `state` and show the status line for `key` (or clear it)
    fn enter(&self, state: InteractionState, key: Option<MessageKey>) {
        let status = key.map_or_else(StatusLine::empty, |k| StatusLine::from(self.messages.get(k)));
        tracing::debug!(%state, "state change");
        self.snapshot.send_modify(|s| {
            s.state = state;
            s.status = status;
        });
    }

    fn append(&self, turn: Turn) {
        let text = turn.text().to_string();
        let role = turn.role();
        let len = {
            let mut conversation = self.lock_conversation();
            conversation.push(turn);
            conversation.len()
        };
        self.snapshot.send_modify(|s| {
            s.last_text = Some(text);
            s.last_role = Some(role);
            s.turns = len;
        });
    }

    fn lock_conversation(&self) -> MutexGuard<'_, Conversation> {
        self.conversation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("is_processing", &self.is_processing())
            .field("welcomed", &self.is_welcomed())
            .finish_non_exhaustive()
    }
}

/// Holds the processing lock for the lifetime of one pipeline run
///
/// Acquired with a compare-and-set so concurrent triggers cannot both enter.
/// Dropping the guard releases the lock on every exit path, including a
/// cancelled future or a panicking collaborator; an interrupted pipeline is
/// put back to idle.
struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
    snapshot: &'a watch::Sender<SessionSnapshot>,
}

impl<'a> ProcessingGuard<'a> {
    fn acquire(session: &'a Session) -> Option<Self> {
        session
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        session.snapshot.send_modify(|s| s.is_processing = true);

        Some(Self {
            flag: &session.processing,
            snapshot: &session.snapshot,
        })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.snapshot.send_modify(|s| {
            if !s.state.is_idle() {
                tracing::warn!(state = %s.state, "pipeline interrupted, returning to idle");
                s.state = InteractionState::Idle;
                s.status = StatusLine::empty();
            }
            s.is_processing = false;
        });
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::{Error, Result};

    struct FixedTranscriber(Option<&'static str>);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn capture(&self) -> Result<String> {
            self.0
                .map(ToString::to_string)
                .ok_or_else(|| Error::Stt("unintelligible".to_string()))
        }
    }

    struct Echo;

    #[async_trait]
    impl Responder for Echo {
        async fn generate(&self, prompt: &str) -> String {
            format!("you said {prompt}")
        }
    }

    #[derive(Default)]
    struct Silent {
        spoken: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl Speaker for Silent {
        async fn speak(&self, text: &str, lang: &str) -> Result<()> {
            self.spoken
                .lock()
                .unwrap()
                .push((text.to_string(), lang.to_string()));
            Ok(())
        }
    }

    struct Panicking;

    #[async_trait]
    impl Transcriber for Panicking {
        async fn capture(&self) -> Result<String> {
            panic!("microphone exploded");
        }
    }

    fn session(transcript: Option<&'static str>) -> Session {
        Session::new(
            FixedTranscriber(transcript),
            Echo,
            Silent::default(),
            MessageCatalog::default(),
        )
    }

    #[tokio::test]
    async fn test_new_session_is_idle_and_empty() {
        let session = session(None);
        assert_eq!(session.state(), InteractionState::Idle);
        assert!(!session.is_processing());
        assert!(!session.is_welcomed());
        assert!(session.conversation().is_empty());
        assert_eq!(session.snapshot(), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn test_whitespace_transcript_is_no_speech() {
        let session = session(Some("   "));
        assert_eq!(session.process_voice_turn().await, TurnOutcome::NoSpeech);
        assert!(session.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_transcript_is_trimmed() {
        let session = session(Some("  hello  "));
        let outcome = session.process_voice_turn().await;
        assert_eq!(
            outcome,
            TurnOutcome::Completed {
                transcript: "hello".to_string(),
                reply: "you said hello".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_snapshot_tracks_last_turn() {
        let session = session(Some("ping"));
        session.process_voice_turn().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, InteractionState::Idle);
        assert!(!snapshot.is_processing);
        assert!(snapshot.status.is_empty());
        assert_eq!(snapshot.last_text.as_deref(), Some("you said ping"));
        assert_eq!(snapshot.turns, 2);
    }

    #[tokio::test]
    async fn test_welcome_keeps_status_after_playing() {
        let session = session(None);
        assert_eq!(session.play_welcome_once().await, WelcomeOutcome::Played);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, InteractionState::Idle);
        assert_eq!(
            snapshot.status,
            StatusLine::from(MessageCatalog::default().get(MessageKey::Welcome))
        );
    }

    #[tokio::test]
    async fn test_panicking_collaborator_releases_lock() {
        let session = Arc::new(Session::new(
            Panicking,
            Echo,
            Silent::default(),
            MessageCatalog::default(),
        ));

        let task = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.process_voice_turn().await })
        };
        assert!(task.await.is_err());

        assert!(!session.is_processing());
        assert_eq!(session.state(), InteractionState::Idle);
        assert!(session.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_end_returns_conversation() {
        let session = session(Some("bye"));
        session.process_voice_turn().await;

        let conversation = session.end();
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.turns()[0].role(), Role::User);
    }
}
