use crate::judge::RelevanceJudge;
use crate::session::SessionStore;
use crate::traits::{DialogueHistory, OutboundSender};
use crate::types::{ChatIdentity, TranscriptEntry, TurnRole};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Observation window opened by a bot-authored message.
///
/// `generation` distinguishes successive windows for the same chat: a
/// deadline timer that fires after its window was superseded sees a newer
/// generation and does nothing. `last_bot_utterance` is frozen at arm time,
/// never re-read.
#[derive(Debug)]
struct InterjectionWindow {
    generation: u64,
    armed_at: DateTime<Utc>,
    last_bot_utterance: String,
    buffer: VecDeque<TranscriptEntry>,
    timer: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct WatchState {
    last_generation: u64,
    window: Option<InterjectionWindow>,
}

struct WatcherInner {
    delay: Duration,
    history_limit: usize,
    judge: Arc<dyn RelevanceJudge>,
    outbound: Arc<dyn OutboundSender>,
    history: Arc<dyn DialogueHistory>,
    /// Present when immersive chat is enabled: a sent interjection also
    /// opens/refreshes that chat's session.
    sessions: Option<Arc<SessionStore>>,
    chats: Mutex<HashMap<ChatIdentity, Arc<Mutex<WatchState>>>>,
}

/// Per-chat proactive-interjection state machine: IDLE → ARMED → EVALUATING.
///
/// Every bot message arms a fresh window; a bot message while a window is
/// already armed replaces it outright (the old buffer is discarded without
/// evaluation). At the deadline the buffered transcript is judged by the
/// external LLM; on a positive verdict the bot speaks and the reply re-arms
/// a new window.
///
/// All transitions for one chat are serialized behind that chat's state
/// lock. The lock is never held across the judge call: the buffer is
/// snapshotted first, and messages arriving during the call belong to the
/// next window.
#[derive(Clone)]
pub struct InterjectionWatcher {
    inner: Arc<WatcherInner>,
}

fn lock(state: &Mutex<WatchState>) -> MutexGuard<'_, WatchState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InterjectionWatcher {
    pub fn new(
        delay: Duration,
        history_limit: usize,
        judge: Arc<dyn RelevanceJudge>,
        outbound: Arc<dyn OutboundSender>,
        history: Arc<dyn DialogueHistory>,
        sessions: Option<Arc<SessionStore>>,
    ) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                delay,
                history_limit,
                judge,
                outbound,
                history,
                sessions,
                chats: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn chat_state(&self, chat: &ChatIdentity) -> Arc<Mutex<WatchState>> {
        let mut chats = self
            .inner
            .chats
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(chats.entry(chat.clone()).or_default())
    }

    fn existing_chat_state(&self, chat: &ChatIdentity) -> Option<Arc<Mutex<WatchState>>> {
        self.inner
            .chats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(chat)
            .map(Arc::clone)
    }

    /// Arm a fresh window for `chat`, replacing (and cancelling the timer
    /// of) any window already armed. Called for every bot-authored message.
    pub fn bot_spoke(&self, chat: &ChatIdentity, text: &str, now: DateTime<Utc>) {
        let state = self.chat_state(chat);
        let generation = {
            let mut guard = lock(&state);
            guard.last_generation += 1;
            let generation = guard.last_generation;

            if let Some(old) = guard.window.take() {
                if let Some(timer) = old.timer {
                    timer.abort();
                }
                tracing::debug!(
                    chat = %chat,
                    superseded = old.generation,
                    "interjection window superseded without evaluation"
                );
            }

            guard.window = Some(InterjectionWindow {
                generation,
                armed_at: now,
                last_bot_utterance: text.to_string(),
                buffer: VecDeque::new(),
                timer: None,
            });
            generation
        };

        let watcher = self.clone();
        let timer_chat = chat.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(watcher.inner.delay).await;
            watcher.deadline_elapsed(timer_chat, generation).await;
        });

        // Attach the abort handle unless the window was already replaced
        // while the task was being spawned; the generation check on firing
        // covers that race either way.
        let mut guard = lock(&state);
        match guard.window.as_mut() {
            Some(window) if window.generation == generation => window.timer = Some(timer),
            _ => timer.abort(),
        }
        tracing::debug!(chat = %chat, generation, "interjection window armed");
    }

    /// Append one chat-classified inbound message to the armed window, if
    /// any. Idle chats ignore traffic entirely.
    pub fn observe(&self, chat: &ChatIdentity, entry: TranscriptEntry) {
        let Some(state) = self.existing_chat_state(chat) else {
            return;
        };
        let mut guard = lock(&state);
        if let Some(window) = guard.window.as_mut() {
            window.buffer.push_back(entry);
            // Bounded buffer: only the most recent lines reach the judge.
            while window.buffer.len() > self.inner.history_limit {
                window.buffer.pop_front();
            }
        }
    }

    /// Whether `chat` currently has an armed window.
    pub fn is_armed(&self, chat: &ChatIdentity) -> bool {
        self.existing_chat_state(chat)
            .is_some_and(|state| lock(&state).window.is_some())
    }

    async fn deadline_elapsed(self, chat: ChatIdentity, generation: u64) {
        let (utterance, transcript) = {
            let Some(state) = self.existing_chat_state(&chat) else {
                return;
            };
            let mut guard = lock(&state);
            // Stale firing for a superseded window is a no-op.
            let Some(window) = guard.window.take_if(|w| w.generation == generation) else {
                return;
            };
            if window.buffer.is_empty() {
                tracing::debug!(
                    chat = %chat,
                    generation,
                    armed_at = %window.armed_at,
                    "window closed on silence"
                );
                return;
            }
            (window.last_bot_utterance, Vec::from(window.buffer))
        };

        let verdict = match self.inner.judge.evaluate(&utterance, &transcript).await {
            Ok(verdict) => verdict,
            Err(e) => {
                // A stale opinion is worse than silence: no retry within the
                // window, nothing surfaced to the chat.
                tracing::warn!(chat = %chat, error = %e, "relevance judge failed, staying silent");
                return;
            }
        };

        if !verdict.should_reply {
            tracing::debug!(chat = %chat, generation, "judge declined to interject");
            return;
        }
        let Some(reply) = verdict.reply_text.filter(|text| !text.trim().is_empty()) else {
            tracing::debug!(chat = %chat, generation, "positive verdict without content");
            return;
        };

        if let Err(e) = self.inner.outbound.send(&chat, &reply).await {
            tracing::warn!(chat = %chat, error = %e, "failed to send interjection");
            return;
        }
        tracing::info!(chat = %chat, "proactive interjection sent");

        match self
            .inner
            .history
            .append_turn(&chat, TurnRole::Assistant, &reply)
            .await
        {
            Ok(context_ref) => {
                if let Some(sessions) = &self.inner.sessions {
                    sessions.open_or_refresh(&chat, context_ref, Utc::now());
                }
            }
            Err(e) => {
                tracing::warn!(chat = %chat, error = %e, "failed to persist interjection turn");
            }
        }

        // The interjection re-enters as a new bot utterance: fresh window,
        // fresh buffer, nothing carried over.
        self.bot_spoke(&chat, &reply, Utc::now());
    }
}
