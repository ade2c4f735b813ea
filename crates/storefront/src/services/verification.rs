//! Single-use email verification codes.
//!
//! Codes are keyed by normalized email. Storing a new code for an email
//! replaces the previous one; a successful verification consumes it.
//!
//! Both go through moka's per-key compute lock, so a verification decides and
//! consumes against exactly one stored code even while a new one is stored.

use std::future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use rand::Rng;
use tracing::debug;

use bazaar_core::Email;

use crate::clock::{Clock, system_clock};

/// Upper bound on outstanding codes.
const MAX_PENDING_CODES: u64 = 100_000;

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
}

/// In-memory verification code store.
#[derive(Clone)]
pub struct VerificationCodes {
    cache: Cache<String, PendingCode>,
    ttl: chrono::Duration,
    clock: Clock,
}

impl std::fmt::Debug for VerificationCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationCodes")
            .field("ttl", &self.ttl)
            .field("pending", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl VerificationCodes {
    /// Create a store whose codes stay valid for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        // moka evicts on its own clock; `expires_at` is the authoritative check.
        let cache = Cache::builder()
            .max_capacity(MAX_PENDING_CODES)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(5)),
            clock: system_clock(),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Generate, store and return a fresh code for `email`.
    pub async fn issue(&self, email: &Email) -> String {
        let code = generate_verification_code();
        self.store(email, &code).await;
        code
    }

    /// Store `code` for `email`, replacing any outstanding code.
    pub async fn store(&self, email: &Email, code: &str) {
        let pending = PendingCode {
            code: code.to_owned(),
            expires_at: (self.clock)() + self.ttl,
        };
        self.cache
            .entry_by_ref(email.as_str())
            .and_upsert_with(|_| future::ready(pending))
            .await;
        debug!(email = %email, "Verification code stored");
    }

    /// Returns `true` iff `code` matches the outstanding code for `email` and
    /// has not expired. A match consumes the code.
    pub async fn verify(&self, email: &Email, code: &str) -> bool {
        let now = (self.clock)();
        let code = code.trim();
        let accepts = |pending: &PendingCode| now < pending.expires_at && pending.code == code;

        let outcome = self
            .cache
            .entry_by_ref(email.as_str())
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if now >= entry.value().expires_at => Op::Remove,
                    Some(entry) if accepts(entry.value()) => Op::Remove,
                    _ => Op::Nop,
                };
                future::ready(op)
            })
            .await;

        // Only the caller that removed a matching entry wins.
        matches!(outcome, CompResult::Removed(entry) if accepts(entry.value()))
    }
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}
