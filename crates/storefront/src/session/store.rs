//! Session token storage.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use bazaar_core::{SessionToken, UserId};

/// What a session token maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: UserId,
    /// Role captured at issue time; admin revocation applies from the next session.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// A session is live strictly before its expiry instant.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Storage for session tokens.
///
/// Implementations must make every operation atomic per token: concurrent
/// handlers race to refresh, revoke and sweep the same entries.
pub trait SessionStore: Send + Sync {
    /// Look up a token, expired or not.
    fn get(&self, token: &SessionToken) -> Option<SessionRecord>;

    /// Insert or replace a token.
    fn insert(&self, token: SessionToken, record: SessionRecord);

    /// Remove a token, returning its record if it was present.
    fn remove(&self, token: &SessionToken) -> Option<SessionRecord>;

    /// Set `last_activity`; returns `false` if the token is unknown.
    fn touch(&self, token: &SessionToken, at: DateTime<Utc>) -> bool;

    /// Delete every record whose `expires_at <= now`; returns how many were removed.
    fn sweep(&self, now: DateTime<Utc>) -> usize;

    /// Number of stored tokens, expired ones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide in-memory store backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionToken, SessionRecord>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, token: &SessionToken) -> Option<SessionRecord> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    fn insert(&self, token: SessionToken, record: SessionRecord) {
        self.sessions.insert(token, record);
    }

    fn remove(&self, token: &SessionToken) -> Option<SessionRecord> {
        self.sessions.remove(token).map(|(_, record)| record)
    }

    fn touch(&self, token: &SessionToken, at: DateTime<Utc>) -> bool {
        self.sessions
            .get_mut(token)
            .map(|mut entry| entry.last_activity = at)
            .is_some()
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, record| record.is_live_at(now));
        before.saturating_sub(self.sessions.len())
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(now: DateTime<Utc>, ttl: Duration) -> SessionRecord {
        SessionRecord {
            user_id: UserId::new(1),
            is_admin: false,
            created_at: now,
            last_activity: now,
            expires_at: now + ttl,
        }
    }

    #[test]
    fn test_live_is_strictly_before_expiry() {
        let now = Utc::now();
        let rec = record(now, Duration::seconds(10));
        assert!(rec.is_live_at(now));
        assert!(!rec.is_live_at(now + Duration::seconds(10)));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        store.insert(SessionToken::from("old"), record(now, Duration::seconds(-1)));
        store.insert(SessionToken::from("edge"), record(now, Duration::zero()));
        store.insert(SessionToken::from("live"), record(now, Duration::hours(1)));

        assert_eq!(store.sweep(now), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&SessionToken::from("live")).is_some());
    }

    #[test]
    fn test_touch_unknown_token() {
        let store = MemorySessionStore::new();
        assert!(!store.touch(&SessionToken::from("missing"), Utc::now()));
    }

    #[test]
    fn test_remove_returns_record_once() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        store.insert(SessionToken::from("t"), record(now, Duration::hours(1)));
        assert!(store.remove(&SessionToken::from("t")).is_some());
        assert!(store.remove(&SessionToken::from("t")).is_none());
        assert!(store.is_empty());
    }
}
