use crate::command::{CommandFilter, MessageClass};
use crate::config::SmartReplyConfig;
use crate::error::{Result, SmartReplyError, TransportError};
use crate::immersive::{ContinuationDecision, ImmersiveTracker};
use crate::judge::RelevanceJudge;
use crate::proactive::InterjectionWatcher;
use crate::session::SessionStore;
use crate::traits::{DialogueHistory, OutboundSender, ReplyGenerator};
use crate::types::{ChatIdentity, ContextRef, InboundMessage, TranscriptEntry, TurnRole};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// How the engine disposed of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Master kill switch off; nothing was touched.
    Disabled,
    /// Control command: routed to command handling only, session closed.
    Command,
    /// Implicit continuation: the bot replied as if it had been addressed.
    Continuation { reply: String },
    /// Ordinary chat message; falls through to the host's normal
    /// addressed/unaddressed handling.
    Passthrough,
}

/// Front door of the smart-reply core. The host runtime feeds every inbound
/// message through [`handle_inbound`](Self::handle_inbound) and reports every
/// bot-authored outbound message through
/// [`note_bot_reply`](Self::note_bot_reply); the engine runs the immersive
/// and proactive state machines on top.
pub struct SmartReplyEngine {
    config: SmartReplyConfig,
    filter: CommandFilter,
    sessions: Arc<SessionStore>,
    tracker: ImmersiveTracker,
    watcher: InterjectionWatcher,
    generator: Arc<dyn ReplyGenerator>,
    outbound: Arc<dyn OutboundSender>,
    history: Arc<dyn DialogueHistory>,
}

impl SmartReplyEngine {
    pub fn new(
        config: SmartReplyConfig,
        judge: Arc<dyn RelevanceJudge>,
        generator: Arc<dyn ReplyGenerator>,
        outbound: Arc<dyn OutboundSender>,
        history: Arc<dyn DialogueHistory>,
    ) -> Result<Self> {
        config.validate()?;

        let filter = CommandFilter::from_config(&config);
        let sessions = Arc::new(SessionStore::new(config.immersive_reply_timeout()));
        let tracker = ImmersiveTracker::new(filter.clone(), Arc::clone(&sessions));
        let watcher = InterjectionWatcher::new(
            config.proactive_reply_delay(),
            config.proactive_history_limit,
            judge,
            Arc::clone(&outbound),
            Arc::clone(&history),
            config
                .enable_immersive_chat
                .then(|| Arc::clone(&sessions)),
        );

        Ok(Self {
            config,
            filter,
            sessions,
            tracker,
            watcher,
            generator,
            outbound,
            history,
        })
    }

    /// Process one inbound message. Commands short-circuit before any
    /// session or window logic; chat messages feed the armed window (if
    /// any) and may fire an immersive continuation.
    pub async fn handle_inbound(&self, message: &InboundMessage) -> Result<InboundOutcome> {
        if !self.config.enable_plugin {
            return Ok(InboundOutcome::Disabled);
        }

        let now = message.timestamp;
        if self.filter.classify(&message.text) == MessageClass::Command {
            // Control traffic closes the session and never enters a buffer.
            self.sessions.invalidate(&message.chat);
            tracing::debug!(chat = %message.chat, "command message, skipping smart-reply paths");
            return Ok(InboundOutcome::Command);
        }

        if self.config.enable_proactive_reply {
            self.watcher.observe(
                &message.chat,
                TranscriptEntry {
                    sender_id: message.sender_id.clone(),
                    sender_name: message.sender_name.clone(),
                    text: message.text.clone(),
                    timestamp: message.timestamp,
                },
            );
        }

        if self.config.enable_immersive_chat {
            if let ContinuationDecision::Continuation(context_ref) =
                self.tracker.on_inbound(&message.chat, &message.text, now)
            {
                let reply = self.continuation_reply(message, &context_ref, now).await?;
                return Ok(InboundOutcome::Continuation { reply });
            }
        }

        Ok(InboundOutcome::Passthrough)
    }

    /// Record a bot-authored outbound message: refreshes the immersive
    /// session and re-arms the observation window. The host calls this for
    /// every reply the bot sends, whatever triggered it.
    pub fn note_bot_reply(
        &self,
        chat: &ChatIdentity,
        text: &str,
        context_ref: ContextRef,
        now: DateTime<Utc>,
    ) {
        if !self.config.enable_plugin {
            return;
        }
        if self.config.enable_immersive_chat {
            self.sessions.open_or_refresh(chat, context_ref, now);
        }
        if self.config.enable_proactive_reply {
            self.watcher.bot_spoke(chat, text, now);
        }
    }

    async fn continuation_reply(
        &self,
        message: &InboundMessage,
        context_ref: &ContextRef,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let reply = self
            .generator
            .generate_reply(context_ref, &message.text)
            .await
            .map_err(|e| {
                tracing::warn!(chat = %message.chat, error = %e, "continuation reply generation failed");
                SmartReplyError::Other(e)
            })?;

        if let Err(e) = self
            .history
            .append_turn(&message.chat, TurnRole::User, &message.text)
            .await
        {
            tracing::warn!(chat = %message.chat, error = %e, "failed to persist user turn");
        }

        // The session was already refreshed by the tracker; a failed send
        // does not roll that back (the attempt happened).
        self.outbound
            .send(&message.chat, &reply)
            .await
            .map_err(|e| {
                tracing::warn!(chat = %message.chat, error = %e, "failed to send continuation reply");
                SmartReplyError::Transport(TransportError::Send {
                    chat: message.chat.to_string(),
                    message: e.to_string(),
                })
            })?;

        let new_ref = match self
            .history
            .append_turn(&message.chat, TurnRole::Assistant, &reply)
            .await
        {
            Ok(new_ref) => new_ref,
            Err(e) => {
                tracing::warn!(chat = %message.chat, error = %e, "failed to persist assistant turn");
                context_ref.clone()
            }
        };

        self.note_bot_reply(&message.chat, &reply, new_ref, now);
        Ok(reply)
    }
}
