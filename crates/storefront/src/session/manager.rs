//! Session lifecycle: issue, verify, rotate, revoke.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use tracing::debug;

use bazaar_core::{SessionToken, UserId};

use super::store::{SessionRecord, SessionStore};
use crate::clock::{Clock, system_clock};

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Issues and validates opaque session tokens.
///
/// Cheap to clone; all clones share one store. Constructed once at startup
/// and handed to request handlers through the application state.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: chrono::Duration,
    clock: Clock,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .field("sessions", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager over `store` issuing tokens valid for `ttl`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, ttl: std::time::Duration) -> Self {
        Self {
            store,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(3650)),
            clock: system_clock(),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Issue a new token for `user_id`.
    pub fn create_session(&self, user_id: UserId, is_admin: bool) -> SessionToken {
        let now = self.now();
        let token = generate_token();
        self.store.insert(
            token.clone(),
            SessionRecord {
                user_id,
                is_admin,
                created_at: now,
                last_activity: now,
                expires_at: now + self.ttl,
            },
        );
        debug!(user_id = %user_id, token = token.fingerprint(), "Session created");
        token
    }

    /// Return the user a token belongs to, or `None` if it is unknown or expired.
    #[must_use]
    pub fn verify_session(&self, token: &SessionToken) -> Option<UserId> {
        self.session(token).map(|record| record.user_id)
    }

    /// Return the full record of a live token.
    #[must_use]
    pub fn session(&self, token: &SessionToken) -> Option<SessionRecord> {
        self.store
            .get(token)
            .filter(|record| record.is_live_at(self.now()))
    }

    /// Delete a token. Idempotent.
    pub fn remove_session(&self, token: &SessionToken) {
        if self.store.remove(token).is_some() {
            debug!(token = token.fingerprint(), "Session removed");
        }
    }

    /// Record activity on a token. Does not extend its expiry.
    pub fn update_session_activity(&self, token: &SessionToken) {
        self.store.touch(token, self.now());
    }

    /// Invalidate `token` and issue a replacement for the same user.
    ///
    /// The old entry is removed first, so of two concurrent rotations of one
    /// token only one obtains a replacement. Returns `None` if the token was
    /// unknown or expired.
    pub fn rotate_session(&self, token: &SessionToken) -> Option<SessionToken> {
        let record = self.store.remove(token)?;
        if !record.is_live_at(self.now()) {
            return None;
        }
        let fresh = self.create_session(record.user_id, record.is_admin);
        debug!(
            user_id = %record.user_id,
            old = token.fingerprint(),
            new = fresh.fingerprint(),
            "Session rotated"
        );
        Some(fresh)
    }

    /// Drop every expired token; returns how many were removed.
    pub fn cleanup_sessions(&self) -> usize {
        self.store.sweep(self.now())
    }

    /// Number of tokens currently held, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// Generate an unguessable URL-safe token from the thread-local CSPRNG.
fn generate_token() -> SessionToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    SessionToken::new(URL_SAFE_NO_PAD.encode(bytes))
}
