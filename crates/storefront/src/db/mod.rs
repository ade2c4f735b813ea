//! Database operations for storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `storefront.user` - Accounts (name, phone, admin flag)
//! - `storefront.user_password` - Argon2 password hashes
//!
//! Sessions are deliberately not stored here; see [`crate::session`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod users;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{Email, UserId};

use crate::models::user::{NewUser, User};

pub use users::UserRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The row to update does not exist.
    #[error("not found")]
    NotFound,

    /// Stored data failed domain validation.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Account lookups needed by the auth service.
///
/// Implemented by [`UserRepository`] against `PostgreSQL`; tests substitute
/// an in-memory map.
pub trait UserStore: Send + Sync {
    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn get_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// User plus password hash, or `None` if the user is unknown or has no password.
    fn get_password_hash(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<(User, String)>, RepositoryError>> + Send;

    /// Insert a user and its password hash; `Conflict` on duplicate email.
    fn create_with_password(
        &self,
        user: &NewUser,
        password_hash: &str,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
