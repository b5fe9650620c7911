use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ── Smart-reply config ────────────────────────────────────────────

/// Configuration surface for the smart-reply engine. Read-only to the core;
/// the host runtime owns where it lives and when it is loaded.
///
/// Every field has a serde default so a partial (or empty) TOML table is
/// valid. `enable_plugin` is the master kill switch; the two feature toggles
/// below it are independent of each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartReplyConfig {
    #[serde(default = "default_enabled")]
    pub enable_plugin: bool,

    /// Lets a user keep talking to the bot without re-addressing it.
    #[serde(default = "default_enabled")]
    pub enable_immersive_chat: bool,

    /// Lets the bot re-enter a conversation unprompted after a short
    /// observation window.
    #[serde(default = "default_enabled")]
    pub enable_proactive_reply: bool,

    /// Length of the proactive observation window, in seconds.
    #[serde(default = "default_proactive_reply_delay_secs")]
    pub proactive_reply_delay_secs: u64,

    /// Lifetime of an immersive session, in seconds.
    #[serde(default = "default_immersive_reply_timeout_secs")]
    pub immersive_reply_timeout_secs: u64,

    /// Most-recent chat lines kept per observation window.
    #[serde(default = "default_proactive_history_limit")]
    pub proactive_history_limit: usize,

    /// Literal prefixes marking a message as a control command.
    #[serde(default = "default_command_prefixes")]
    pub command_prefixes: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_proactive_reply_delay_secs() -> u64 {
    8
}

fn default_immersive_reply_timeout_secs() -> u64 {
    120
}

fn default_proactive_history_limit() -> usize {
    10
}

fn default_command_prefixes() -> Vec<String> {
    vec!["/".into(), "!".into(), "#".into()]
}

impl Default for SmartReplyConfig {
    fn default() -> Self {
        Self {
            enable_plugin: default_enabled(),
            enable_immersive_chat: default_enabled(),
            enable_proactive_reply: default_enabled(),
            proactive_reply_delay_secs: default_proactive_reply_delay_secs(),
            immersive_reply_timeout_secs: default_immersive_reply_timeout_secs(),
            proactive_history_limit: default_proactive_history_limit(),
            command_prefixes: default_command_prefixes(),
        }
    }
}

impl SmartReplyConfig {
    /// Observation-window length as a scheduler duration.
    pub fn proactive_reply_delay(&self) -> Duration {
        Duration::from_secs(self.proactive_reply_delay_secs)
    }

    /// Session lifetime as a timestamp delta.
    pub fn immersive_reply_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(
            i64::try_from(self.immersive_reply_timeout_secs).unwrap_or(i64::MAX),
        )
    }

    /// Reject configurations that would arm zero-length timers or classify
    /// every message as a command.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enable_immersive_chat && self.immersive_reply_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "immersive_reply_timeout_secs must be > 0 when immersive chat is enabled".into(),
            ));
        }
        if self.enable_proactive_reply && self.proactive_reply_delay_secs == 0 {
            return Err(ConfigError::Validation(
                "proactive_reply_delay_secs must be > 0 when proactive reply is enabled".into(),
            ));
        }
        if self.enable_proactive_reply && self.proactive_history_limit == 0 {
            return Err(ConfigError::Validation(
                "proactive_history_limit must be > 0 when proactive reply is enabled".into(),
            ));
        }
        if self.command_prefixes.iter().any(String::is_empty) {
            return Err(ConfigError::Validation(
                "command_prefixes must not contain an empty prefix".into(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }
}
