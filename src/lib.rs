#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

//! Smart-reply engine for group-chat bots.
//!
//! Two conversational behaviors layered on top of a host bot runtime:
//! **immersive continuation** (a user keeps talking to the bot without
//! re-addressing it while a per-chat session is open) and **proactive
//! interjection** (the bot re-enters a conversation unprompted when an LLM
//! judges the chat after its last message relevant). The crate owns the
//! per-chat state machines and timers; transport, LLM calls, and dialogue
//! persistence stay behind the collaborator traits in [`traits`] and
//! [`judge`].

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod immersive;
pub mod judge;
pub mod proactive;
pub mod session;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use command::{CommandFilter, MessageClass};
pub use config::SmartReplyConfig;
pub use engine::{InboundOutcome, SmartReplyEngine};
pub use error::{Result, SmartReplyError};
pub use immersive::{ContinuationDecision, ImmersiveTracker};
pub use judge::{RelevanceJudge, build_judgment_prompt, parse_verdict};
pub use proactive::InterjectionWatcher;
pub use session::{ImmersiveSession, SessionStore};
pub use traits::{DialogueHistory, OutboundSender, ReplyGenerator};
pub use types::{ChatIdentity, ContextRef, InboundMessage, TranscriptEntry, TurnRole, Verdict};
