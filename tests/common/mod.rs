//! Shared test utilities
//!
//! Scripted collaborators that record every call together with the session
//! state observed at the moment of the call.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use tokio::sync::{Notify, watch};

use parley::config::MessageCatalog;
use parley::{
    Error, InteractionState, Responder, Result, Session, SessionSnapshot, Speaker, Transcriber,
};

/// What a collaborator was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    Capture,
    Generate(String),
    Speak { text: String, lang: String },
}

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: CallKind,
    /// Session state at the time of the call, once attached
    pub state: Option<InteractionState>,
    pub is_processing: Option<bool>,
}

/// Shared call log for all scripted collaborators of one session
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    probe: Arc<OnceLock<watch::Receiver<SessionSnapshot>>>,
}

impl Recorder {
    /// Start observing `session` so calls record its state
    pub fn attach(&self, session: &Session) {
        let _ = self.probe.set(session.subscribe());
    }

    fn record(&self, kind: CallKind) {
        let snapshot = self.probe.get().map(|rx| rx.borrow().clone());
        self.calls.lock().unwrap().push(Call {
            kind,
            state: snapshot.as_ref().map(|s| s.state),
            is_processing: snapshot.as_ref().map(|s| s.is_processing),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<CallKind> {
        self.calls().into_iter().map(|c| c.kind).collect()
    }

    /// `(text, lang)` of every speak call, in order
    pub fn spoken(&self) -> Vec<(String, String)> {
        self.kinds()
            .into_iter()
            .filter_map(|k| match k {
                CallKind::Speak { text, lang } => Some((text, lang)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&CallKind) -> bool) -> usize {
        self.kinds().iter().filter(|k| pred(k)).count()
    }
}

/// Pauses a collaborator until the test lets it continue
#[derive(Clone, Default)]
pub struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    /// Wait until the gated call has started
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the gated call finish
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// Transcriber that returns scripted results in order, then empty text
pub struct ScriptedTranscriber {
    recorder: Recorder,
    script: Mutex<VecDeque<Result<String>>>,
    gate: Option<Gate>,
}

impl ScriptedTranscriber {
    pub fn new(recorder: &Recorder, script: Vec<Result<String>>) -> Self {
        Self {
            recorder: recorder.clone(),
            script: Mutex::new(script.into()),
            gate: None,
        }
    }

    /// Hold every capture at `gate` until released
    pub fn gated(mut self, gate: &Gate) -> Self {
        self.gate = Some(gate.clone());
        self
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn capture(&self) -> Result<String> {
        self.recorder.record(CallKind::Capture);
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Responder that returns scripted replies in order, then echoes
pub struct ScriptedResponder {
    recorder: Recorder,
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedResponder {
    pub fn new(recorder: &Recorder, replies: Vec<&str>) -> Self {
        Self {
            recorder: recorder.clone(),
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
        }
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn generate(&self, prompt: &str) -> String {
        self.recorder.record(CallKind::Generate(prompt.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("echo: {prompt}"))
    }
}

/// Speaker that records what it was asked to say
pub struct ScriptedSpeaker {
    recorder: Recorder,
    failing: Arc<AtomicBool>,
}

impl ScriptedSpeaker {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A speaker whose every playback fails
    pub fn failing(recorder: &Recorder) -> Self {
        let speaker = Self::new(recorder);
        speaker.failing.store(true, Ordering::SeqCst);
        speaker
    }
}

#[async_trait]
impl Speaker for ScriptedSpeaker {
    async fn speak(&self, text: &str, lang: &str) -> Result<()> {
        self.recorder.record(CallKind::Speak {
            text: text.to_string(),
            lang: lang.to_string(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Audio("no output device available".to_string()));
        }
        Ok(())
    }
}

/// Build a session over scripted collaborators and attach the recorder
pub fn scripted_session(
    transcripts: Vec<Result<String>>,
    replies: Vec<&str>,
) -> (Session, Recorder) {
    let recorder = Recorder::default();
    let session = Session::new(
        ScriptedTranscriber::new(&recorder, transcripts),
        ScriptedResponder::new(&recorder, replies),
        ScriptedSpeaker::new(&recorder),
        MessageCatalog::default(),
    );
    recorder.attach(&session);
    (session, recorder)
}

/// A transcript result
pub fn heard(text: &str) -> Result<String> {
    Ok(text.to_string())
}

/// A transcription failure
pub fn not_heard() -> Result<String> {
    Err(Error::Stt("unintelligible audio".to_string()))
}
