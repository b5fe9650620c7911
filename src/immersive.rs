use crate::command::{CommandFilter, MessageClass};
use crate::session::SessionStore;
use crate::types::{ChatIdentity, ContextRef};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Whether an inbound message implicitly continues an open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuationDecision {
    /// Treat the message as addressed to the bot; invoke the LLM with the
    /// carried context plus the new message.
    Continuation(ContextRef),
    /// Fall through to normal addressed/unaddressed handling.
    NotContinuation,
}

/// Deterministic continuation check, run before any LLM invocation.
///
/// Command detection happens first: a command both fails the continuation
/// check and closes the open session, so control traffic inside a live
/// window never reads as conversation.
pub struct ImmersiveTracker {
    filter: CommandFilter,
    sessions: Arc<SessionStore>,
}

impl ImmersiveTracker {
    pub fn new(filter: CommandFilter, sessions: Arc<SessionStore>) -> Self {
        Self { filter, sessions }
    }

    pub fn on_inbound(
        &self,
        chat: &ChatIdentity,
        text: &str,
        now: DateTime<Utc>,
    ) -> ContinuationDecision {
        if self.filter.classify(text) == MessageClass::Command {
            self.sessions.invalidate(chat);
            return ContinuationDecision::NotContinuation;
        }

        match self.sessions.lookup(chat, now) {
            Some(session) => {
                // Continued use slides the expiry forward.
                self.sessions
                    .open_or_refresh(chat, session.context_ref.clone(), now);
                tracing::debug!(chat = %chat, "treating message as immersive continuation");
                ContinuationDecision::Continuation(session.context_ref)
            }
            None => ContinuationDecision::NotContinuation,
        }
    }
}
