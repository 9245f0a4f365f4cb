//! Owns the conversation and the single-flight pending flag.

use crate::core::adapter::ResponseGenerator;
use crate::core::error::GenerateError;
use crate::providers::Message;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, or a generation was already in flight. Nothing changed.
    Ignored,
    Answered(String),
    /// The user message stays; no assistant message was appended.
    Failed(GenerateError),
}

#[derive(Default)]
struct ConversationState {
    messages: Vec<Message>,
    pending: bool,
    last_error: Option<String>,
}

pub struct ChatController {
    generator: Box<dyn ResponseGenerator>,
    state: Mutex<ConversationState>,
}

/// Releases the pending flag even if the submit future is dropped mid-call.
struct PendingGuard<'a> {
    controller: &'a ChatController,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.controller.state().pending = false;
    }
}

impl ChatController {
    pub fn new(generator: Box<dyn ResponseGenerator>) -> Self {
        Self {
            generator,
            state: Mutex::new(ConversationState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send one user turn. The lock is never held across the generation, so
    /// a concurrent `submit` sees the pending flag and is ignored.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let snapshot = {
            let mut state = self.state();
            if state.pending {
                tracing::debug!("submit ignored: generation already in flight");
                return SubmitOutcome::Ignored;
            }
            state.messages.push(Message::user(text));
            state.pending = true;
            state.last_error = None;
            state.messages.clone()
        };
        let guard = PendingGuard { controller: self };

        let result = self.generator.generate(&snapshot).await;

        let outcome = {
            let mut state = self.state();
            match result {
                Ok(reply) => {
                    state.messages.push(Message::assistant(reply.clone()));
                    SubmitOutcome::Answered(reply)
                }
                Err(err) => {
                    state.last_error = Some(err.user_message());
                    SubmitOutcome::Failed(err)
                }
            }
        };
        drop(guard);
        outcome
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state().pending
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    /// Consume the transient error banner.
    pub fn take_error(&self) -> Option<String> {
        self.state().last_error.take()
    }
}
