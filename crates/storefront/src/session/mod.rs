//! Opaque-token sessions.
//!
//! Sessions live only in process memory: a restart logs everyone out, and
//! clients fall back to restore-session.
//!
//! - [`store`] - The token map (`get/insert/remove/sweep`) behind a trait
//! - [`manager`] - Issue, verify, rotate and revoke tokens
//! - [`cleanup`] - Background sweep of expired tokens

pub mod cleanup;
pub mod manager;
pub mod store;

pub use cleanup::spawn_cleanup_task;
pub use manager::SessionManager;
pub use store::{MemorySessionStore, SessionRecord, SessionStore};
