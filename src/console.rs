//! Terminal presentation of a running session
//!
//! Reads only the observer interface ([`crate::Session::subscribe`]) and
//! prints a line whenever the phase, the status text or the conversation
//! changes.

use std::io::Write;

use tokio::sync::watch;

use crate::session::{InteractionState, Role, SessionSnapshot, StatusLine};

/// Renders snapshot changes to a writer
#[derive(Debug)]
pub struct ConsoleView<W> {
    out: W,
    last: SessionSnapshot,
}

impl<W: Write> ConsoleView<W> {
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out,
            last: SessionSnapshot::default(),
        }
    }

    /// Print whatever changed since the previous snapshot
    ///
    /// # Errors
    ///
    /// Returns error if writing to the output fails
    pub fn update(&mut self, snapshot: &SessionSnapshot) -> std::io::Result<()> {
        if snapshot.turns > self.last.turns
            && let Some(text) = &snapshot.last_text
        {
            let who = match snapshot.last_role {
                Some(Role::User) => "you",
                Some(Role::Assistant) | None => "assistant",
            };
            writeln!(self.out, "{who:>9}: {text}")?;
        }

        if (snapshot.state != self.last.state || snapshot.status != self.last.status)
            && let Some(line) = status_line(snapshot.state, &snapshot.status)
        {
            writeln!(self.out, "{line}")?;
        }

        self.out.flush()?;
        self.last = snapshot.clone();
        Ok(())
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Format the phase marker and bilingual status, or nothing when idle and silent
#[must_use]
pub fn status_line(state: InteractionState, status: &StatusLine) -> Option<String> {
    let marker = match state {
        InteractionState::Idle => "  ",
        InteractionState::Listening => "🎤",
        InteractionState::Thinking => "💭",
        InteractionState::Speaking => "🔊",
    };

    match (status.primary.is_empty(), status.secondary.is_empty()) {
        (true, true) if state.is_idle() => None,
        (true, true) => Some(format!("{marker} [{state}]")),
        (false, true) => Some(format!("{marker} {}", status.primary)),
        (true, false) => Some(format!("{marker} {}", status.secondary)),
        (false, false) => Some(format!("{marker} {} / {}", status.primary, status.secondary)),
    }
}

/// Print snapshot changes to stdout until the session is dropped
pub async fn run(mut rx: watch::Receiver<SessionSnapshot>) {
    let mut view = ConsoleView::new(std::io::stdout());

    loop {
        let snapshot = rx.borrow_and_update().clone();
        if let Err(e) = view.update(&snapshot) {
            tracing::warn!(error = %e, "console output failed");
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
