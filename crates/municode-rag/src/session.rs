//! Per-session chat state

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use municode_core::{ChatMessage, Error, Model, Result};

/// Lifecycle of the chat history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    ResetPending,
}

/// State owned by one chat session
///
/// History is append-only while active. A reset only marks the session;
/// the history is dropped by [`ChatSession::apply_pending_reset`] before the
/// next render.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    state: SessionState,
    messages: Vec<ChatMessage>,
    model: Model,
    num_chunks: usize,
}

impl ChatSession {
    pub const MIN_CHUNKS: usize = 1;
    pub const MAX_CHUNKS: usize = 10;
    pub const DEFAULT_CHUNKS: usize = 5;

    pub fn new(model: Model, num_chunks: usize) -> Result<Self> {
        Self::check_chunks(num_chunks)?;
        let session = Self {
            id: Uuid::new_v4(),
            state: SessionState::Active,
            messages: Vec::new(),
            model,
            num_chunks,
        };
        info!(session = %session.id, model = %model, num_chunks, "chat session started");
        Ok(session)
    }

    fn check_chunks(num_chunks: usize) -> Result<()> {
        if (Self::MIN_CHUNKS..=Self::MAX_CHUNKS).contains(&num_chunks) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "number of context chunks must be between {} and {}, got {}",
                Self::MIN_CHUNKS,
                Self::MAX_CHUNKS,
                num_chunks
            )))
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    pub fn num_chunks(&self) -> usize {
        self.num_chunks
    }

    pub fn set_num_chunks(&mut self, num_chunks: usize) -> Result<()> {
        Self::check_chunks(num_chunks)?;
        self.num_chunks = num_chunks;
        Ok(())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn request_reset(&mut self) {
        self.state = SessionState::ResetPending;
    }

    /// Clear the history if a reset was requested and return to active
    pub fn apply_pending_reset(&mut self) {
        if self.state == SessionState::ResetPending {
            info!(session = %self.id, dropped = self.messages.len(), "chat history cleared");
            self.messages.clear();
            self.state = SessionState::Active;
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.apply_pending_reset();
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.apply_pending_reset();
        self.messages.push(ChatMessage::assistant(content));
    }
}
