use crate::types::{ChatIdentity, ContextRef};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Immersive-session record for one chat. Created only as a side effect of
/// the bot producing output; self-expires rather than being deleted.
#[derive(Debug, Clone)]
pub struct ImmersiveSession {
    /// Timestamp of the bot reply that started or extended the session.
    pub opened_at: DateTime<Utc>,
    /// `opened_at + immersive_reply_timeout`.
    pub expires_at: DateTime<Utc>,
    /// Dialogue-history slice to feed back into the LLM on continuation.
    pub context_ref: ContextRef,
}

impl ImmersiveSession {
    /// Exclusive on the live side: a session at exactly `expires_at` is gone.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Process-wide map from chat identity to its immersive session. At most one
/// session per chat; a new bot reply replaces the old session outright.
///
/// An expired session is logically absent: lookups treat it as a cache miss,
/// never as an error. Eviction of stale entries is an optimization only.
pub struct SessionStore {
    timeout: Duration,
    sessions: Mutex<HashMap<ChatIdentity, ImmersiveSession>>,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<ChatIdentity, ImmersiveSession>> {
        // The map stays usable even if a holder panicked mid-update; every
        // mutation below is a single insert/remove.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or overwrite the session for `chat`. Called once per
    /// bot-authored reply; always replaces, never merges.
    pub fn open_or_refresh(&self, chat: &ChatIdentity, context_ref: ContextRef, now: DateTime<Utc>) {
        let session = ImmersiveSession {
            opened_at: now,
            expires_at: now + self.timeout,
            context_ref,
        };
        self.guard().insert(chat.clone(), session);
        tracing::debug!(chat = %chat, "immersive session opened");
    }

    /// Return the session iff it is still live at `now`. Stale entries are
    /// evicted on the way out.
    pub fn lookup(&self, chat: &ChatIdentity, now: DateTime<Utc>) -> Option<ImmersiveSession> {
        let mut sessions = self.guard();
        match sessions.get(chat) {
            Some(session) if session.is_live(now) => Some(session.clone()),
            Some(_) => {
                sessions.remove(chat);
                tracing::debug!(chat = %chat, "immersive session expired");
                None
            }
            None => None,
        }
    }

    /// Explicit close, used when a command message is seen. Absence is fine.
    pub fn invalidate(&self, chat: &ChatIdentity) {
        if self.guard().remove(chat).is_some() {
            tracing::debug!(chat = %chat, "immersive session invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn chat() -> ChatIdentity {
        ChatIdentity::new("qq", "group-1")
    }

    fn store(timeout_secs: i64) -> SessionStore {
        SessionStore::new(Duration::seconds(timeout_secs))
    }

    #[test]
    fn lookup_before_expiry_returns_session() {
        let store = store(120);
        store.open_or_refresh(&chat(), ContextRef::new("ctx-1"), t(0));

        let session = store.lookup(&chat(), t(30)).unwrap();
        assert_eq!(session.context_ref, ContextRef::new("ctx-1"));
        assert_eq!(session.expires_at, t(120));
    }

    #[test]
    fn lookup_at_exact_expiry_is_absent() {
        let store = store(120);
        store.open_or_refresh(&chat(), ContextRef::new("ctx-1"), t(0));

        assert!(store.lookup(&chat(), t(119)).is_some());
        assert!(store.lookup(&chat(), t(120)).is_none());
    }

    #[test]
    fn stale_lookup_evicts_entry() {
        let store = store(120);
        store.open_or_refresh(&chat(), ContextRef::new("ctx-1"), t(0));

        assert!(store.lookup(&chat(), t(200)).is_none());
        // Even an earlier `now` sees nothing once evicted.
        assert!(store.lookup(&chat(), t(30)).is_none());
    }

    #[test]
    fn open_replaces_existing_session() {
        let store = store(120);
        store.open_or_refresh(&chat(), ContextRef::new("ctx-1"), t(0));
        store.open_or_refresh(&chat(), ContextRef::new("ctx-2"), t(60));

        let session = store.lookup(&chat(), t(150)).unwrap();
        assert_eq!(session.opened_at, t(60));
        assert_eq!(session.expires_at, t(180));
        assert_eq!(session.context_ref, ContextRef::new("ctx-2"));
    }

    #[test]
    fn invalidate_closes_session_immediately() {
        let store = store(120);
        store.open_or_refresh(&chat(), ContextRef::new("ctx-1"), t(0));

        store.invalidate(&chat());
        assert!(store.lookup(&chat(), t(1)).is_none());
    }

    #[test]
    fn invalidate_without_session_is_a_no_op() {
        let store = store(120);
        store.invalidate(&chat());
        assert!(store.lookup(&chat(), t(0)).is_none());
    }

    #[test]
    fn chats_are_independent() {
        let store = store(120);
        let other = ChatIdentity::new("qq", "group-2");
        store.open_or_refresh(&chat(), ContextRef::new("ctx-1"), t(0));

        assert!(store.lookup(&other, t(10)).is_none());
        store.invalidate(&other);
        assert!(store.lookup(&chat(), t(10)).is_some());
    }
}
