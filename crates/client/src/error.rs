//! Client error types.

use thiserror::Error;

use bazaar_core::ProductError;

use crate::storage::StorageError;

/// Errors talking to the storefront.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connection refused, timeout, bad body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Base URL or endpoint path did not parse.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Local storage write failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A restore was requested but no user is remembered.
    #[error("no remembered user to restore")]
    NoRememberedIdentity,
}

impl ClientError {
    /// The server rejected the credentials or token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Errors from the product synchronizer.
///
/// Local parse failures never surface here; they are recovered from the
/// backup key, the server, or the seed set.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The input to `save_products` was not an array.
    #[error(transparent)]
    Invalid(#[from] ProductError),

    /// Writing local storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The local write succeeded but the server push failed.
    #[error("server sync failed: {0}")]
    Remote(#[source] ClientError),
}
