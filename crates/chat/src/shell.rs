//! Chat shell - owns the transcript and turns replies into displayable turns

use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use advisor_agent::Reply;
use advisor_session::{Role, SessionError, SessionStore, Transcript, Turn, TurnContent};

use crate::{display_text, QueryHandler, DESCRIPTION, TITLE};

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Session(#[from] SessionError),
}

/// Whether the latest exchange has been shown yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    Idle,
    AwaitingRender,
}

pub struct ChatShell {
    handler: Arc<dyn QueryHandler>,
    store: Arc<dyn SessionStore>,
    transcript: Transcript,
    state: ShellState,
}

impl ChatShell {
    /// Start a fresh conversation
    pub fn new(handler: Arc<dyn QueryHandler>, store: Arc<dyn SessionStore>) -> Self {
        Self::with_transcript(handler, store, Transcript::new())
    }

    pub fn with_transcript(
        handler: Arc<dyn QueryHandler>,
        store: Arc<dyn SessionStore>,
        transcript: Transcript,
    ) -> Self {
        Self {
            handler,
            store,
            transcript,
            state: ShellState::Idle,
        }
    }

    /// Continue a stored conversation, or start one under this id
    pub async fn resume(
        handler: Arc<dyn QueryHandler>,
        store: Arc<dyn SessionStore>,
        id: &str,
    ) -> Result<Self, ChatError> {
        let transcript = match store.load(id).await? {
            Some(transcript) => {
                info!("Resuming session {} ({} turns)", id, transcript.len());
                transcript
            }
            None => Transcript::with_id(id),
        };
        Ok(Self::with_transcript(handler, store, transcript))
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    /// Ask one question and record both sides of the exchange.
    ///
    /// Returns the text shown for the answer.
    pub async fn submit(&mut self, text: &str) -> String {
        self.transcript.push(Turn::user(text));

        debug!("Submitting query: {}", text);
        let reply = self.handler.handle(text).await;
        if let Reply::Failed(failure) = &reply {
            warn!("Query failed ({}): {}", failure.kind, failure.details);
        }

        let answer = display_text(&TurnContent::from(reply.to_value()));
        self.transcript.push(Turn::assistant(answer.clone()));
        self.state = ShellState::AwaitingRender;

        if let Err(e) = self.store.save(&self.transcript).await {
            warn!("Failed to save session {}: {}", self.transcript.id, e);
        }

        answer
    }

    /// Write the header and the whole transcript, oldest turn first
    pub fn render<W: Write>(&mut self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{}", TITLE)?;
        writeln!(out)?;
        writeln!(out, "{}", DESCRIPTION)?;

        for turn in self.transcript.turns() {
            writeln!(out)?;
            let label = match turn.role {
                Role::User => "You",
                Role::Assistant => "Advisor",
            };
            writeln!(out, "{}: {}", label, display_text(&turn.content))?;
        }

        out.flush()?;
        self.state = ShellState::Idle;
        Ok(())
    }
}
