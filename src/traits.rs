//! Collaborator seams toward the host bot runtime. The core owns none of the
//! transport, LLM, or persistence machinery behind these.

use crate::types::{ChatIdentity, ContextRef, TurnRole};
use async_trait::async_trait;

/// Outbound send capability of the host message bus.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    async fn send(&self, chat: &ChatIdentity, text: &str) -> anyhow::Result<()>;
}

/// LLM invocation used for immersive continuations: the stored context plus
/// the new message, addressed as if the bot had been mentioned.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_reply(
        &self,
        context_ref: &ContextRef,
        new_text: &str,
    ) -> anyhow::Result<String>;
}

/// Append-only view of the external dialogue store. Returns the handle to
/// the updated history slice so follow-up turns can carry it.
#[async_trait]
pub trait DialogueHistory: Send + Sync {
    async fn append_turn(
        &self,
        chat: &ChatIdentity,
        role: TurnRole,
        text: &str,
    ) -> anyhow::Result<ContextRef>;
}
