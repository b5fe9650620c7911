//! Scripted collaborators shared by the watcher and engine tests.

use crate::judge::RelevanceJudge;
use crate::traits::{DialogueHistory, OutboundSender, ReplyGenerator};
use crate::types::{ChatIdentity, ContextRef, TranscriptEntry, TurnRole, Verdict};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn entry(sender: &str, text: &str) -> TranscriptEntry {
    TranscriptEntry {
        sender_id: sender.to_lowercase(),
        sender_name: sender.to_string(),
        text: text.to_string(),
        timestamp: Utc::now(),
    }
}

/// Let spawned timer tasks run to completion after a paused-clock advance.
pub(crate) async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

// ── Outbound ──────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct RecordingSender {
    sent_log: Mutex<Vec<(ChatIdentity, String)>>,
    pub fail: AtomicBool,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<(ChatIdentity, String)> {
        self.sent_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutboundSender for RecordingSender {
    async fn send(&self, chat: &ChatIdentity, text: &str) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("message bus unavailable");
        }
        self.sent_log
            .lock()
            .unwrap()
            .push((chat.clone(), text.to_string()));
        Ok(())
    }
}

// ── Judge ─────────────────────────────────────────────────────────

/// Pops one scripted verdict per call; answers silently once exhausted.
pub(crate) struct ScriptedJudge {
    verdicts: Mutex<VecDeque<anyhow::Result<Verdict>>>,
    delay: Mutex<Option<Duration>>,
    call_log: Mutex<Vec<(String, Vec<TranscriptEntry>)>>,
}

impl ScriptedJudge {
    pub fn silent() -> Arc<Self> {
        Self::with(Vec::new())
    }

    pub fn with(verdicts: Vec<anyhow::Result<Verdict>>) -> Arc<Self> {
        Arc::new(Self {
            verdicts: Mutex::new(verdicts.into()),
            delay: Mutex::new(None),
            call_log: Mutex::new(Vec::new()),
        })
    }

    /// Simulate a slow LLM call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<(String, Vec<TranscriptEntry>)> {
        self.call_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelevanceJudge for ScriptedJudge {
    async fn evaluate(
        &self,
        last_bot_utterance: &str,
        transcript: &[TranscriptEntry],
    ) -> anyhow::Result<Verdict> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.call_log
            .lock()
            .unwrap()
            .push((last_bot_utterance.to_string(), transcript.to_vec()));
        self.verdicts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Verdict::silent()))
    }
}

// ── Continuation generator ────────────────────────────────────────

pub(crate) struct ScriptedGenerator {
    pub reply: String,
    pub fail: AtomicBool,
    call_log: Mutex<Vec<(ContextRef, String)>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: AtomicBool::new(false),
            call_log: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(ContextRef, String)> {
        self.call_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyGenerator for ScriptedGenerator {
    async fn generate_reply(
        &self,
        context_ref: &ContextRef,
        new_text: &str,
    ) -> anyhow::Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("provider unavailable");
        }
        self.call_log
            .lock()
            .unwrap()
            .push((context_ref.clone(), new_text.to_string()));
        Ok(self.reply.clone())
    }
}

// ── Dialogue history ──────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct MemoryHistory {
    turn_log: Mutex<Vec<(ChatIdentity, TurnRole, String)>>,
    pub fail: AtomicBool,
}

impl MemoryHistory {
    pub fn turns(&self) -> Vec<(ChatIdentity, TurnRole, String)> {
        self.turn_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialogueHistory for MemoryHistory {
    async fn append_turn(
        &self,
        chat: &ChatIdentity,
        role: TurnRole,
        text: &str,
    ) -> anyhow::Result<ContextRef> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("dialogue store unavailable");
        }
        let mut turns = self.turn_log.lock().unwrap();
        turns.push((chat.clone(), role, text.to_string()));
        Ok(ContextRef::new(format!("ctx-{}", turns.len())))
    }
}
