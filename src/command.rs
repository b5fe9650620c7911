use crate::config::SmartReplyConfig;

/// Classification of an inbound message before any session or window logic
/// runs. Commands are routed to command handling only: they never enter a
/// window buffer, never continue a session, and never trigger an LLM call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MessageClass {
    Command,
    Chat,
}

/// Literal-prefix command detector. Pure classification, no side effects.
#[derive(Debug, Clone)]
pub struct CommandFilter {
    prefixes: Vec<String>,
}

impl CommandFilter {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    pub fn from_config(config: &SmartReplyConfig) -> Self {
        Self::new(config.command_prefixes.clone())
    }

    /// Literal prefix test against the configured set. Empty prefixes are
    /// ignored (they would match everything).
    pub fn classify(&self, text: &str) -> MessageClass {
        let is_command = self
            .prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && text.starts_with(prefix.as_str()));
        if is_command {
            MessageClass::Command
        } else {
            MessageClass::Chat
        }
    }
}
