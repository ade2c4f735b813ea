//! Periodic sweep of expired session tokens.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::manager::SessionManager;

/// Spawn a task that calls [`SessionManager::cleanup_sessions`] every `interval`.
///
/// The task runs until the returned handle is aborted.
#[must_use]
pub fn spawn_cleanup_task(manager: SessionManager, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can have expired yet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = manager.cleanup_sessions();
            if removed > 0 {
                info!(removed, remaining = manager.len(), "Swept expired sessions");
            } else {
                debug!(remaining = manager.len(), "Session sweep found nothing to remove");
            }
        }
    })
}
