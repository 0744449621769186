//! Conversation state for multi-turn chat.

use futures_util::{Stream, StreamExt};
use sahayak_api::{Content, GenerateRequest, Role, SahayakApiError};
use tracing::{debug, warn};

/// Ordered history of turns sent as `contents` with each generation.
///
/// A turn is only committed once its reply streamed to completion; a failed
/// reply rolls the pending user turn back so the history keeps alternating.
#[derive(Debug, Clone)]
pub struct ChatSession {
    model: String,
    history: Vec<Content>,
    pending: bool,
}

impl ChatSession {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            history: Vec::new(),
            pending: false,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history(&self) -> &[Content] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.pending = false;
    }

    /// Record the user's prompt and build the request for the whole history.
    pub fn begin_turn(&mut self, prompt: &str) -> Result<GenerateRequest, SahayakApiError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SahayakApiError::InvalidRequest("prompt is empty".to_string()));
        }
        if self.pending {
            // The previous turn was never consumed.
            self.rollback();
        }

        self.history.push(Content::user(prompt));
        self.pending = true;
        Ok(GenerateRequest::new(self.model.clone(), self.history.clone()))
    }

    /// Accumulate the reply for the pending turn.
    ///
    /// `on_token` sees every token up to the first failure and nothing after
    /// it. On failure the partial reply is discarded.
    pub async fn consume<S, F>(&mut self, mut tokens: S, mut on_token: F) -> Result<String, SahayakApiError>
    where
        S: Stream<Item = Result<String, SahayakApiError>> + Unpin,
        F: FnMut(&str),
    {
        let mut reply = String::new();
        while let Some(token) = tokens.next().await {
            match token {
                Ok(token) => {
                    on_token(&token);
                    reply.push_str(&token);
                }
                Err(error) => {
                    warn!("reply failed after {} chars: {error}", reply.len());
                    self.rollback();
                    return Err(error);
                }
            }
        }

        self.history.push(Content::model(reply.clone()));
        self.pending = false;
        debug!("turn committed; history has {} entries", self.history.len());
        Ok(reply)
    }

    fn rollback(&mut self) {
        if self.pending && matches!(self.history.last(), Some(turn) if turn.role == Role::User) {
            self.history.pop();
        }
        self.pending = false;
    }
}
