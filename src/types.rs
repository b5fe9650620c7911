use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Partition key identifying one conversation stream (platform + group id).
///
/// All per-chat state — immersive sessions, interjection windows — is keyed
/// by this and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatIdentity {
    pub platform: String,
    pub chat_id: String,
}

impl ChatIdentity {
    pub fn new(platform: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            chat_id: chat_id.into(),
        }
    }
}

impl std::fmt::Display for ChatIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.platform, self.chat_id)
    }
}

/// Opaque handle to a slice of dialogue history held by the external store.
///
/// This crate only reads and forwards it; the dialogue store owns the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRef(String);

impl ContextRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Inbound message event as delivered by the host message bus.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat: ChatIdentity,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// One observed chat line inside an interjection window buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    /// Render as a `name(id): text` transcript line for the judge prompt.
    pub fn as_prompt_line(&self) -> String {
        format!("{}({}): {}", self.sender_name, self.sender_id, self.text)
    }
}

/// Role of a turn persisted through the dialogue-history collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// Relevance decision returned by the judge. Transient, never persisted.
///
/// The wire shape accepts `reply_content` as an alias so the strict-JSON
/// answer requested from the model deserializes directly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub should_reply: bool,
    #[serde(default, alias = "reply_content")]
    pub reply_text: Option<String>,
}

impl Verdict {
    /// Negative verdict; also what a failed judge call collapses to.
    pub fn silent() -> Self {
        Self::default()
    }
}
