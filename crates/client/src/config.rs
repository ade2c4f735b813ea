//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// Default interval between token rotations.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Where the storefront lives and how often to rotate tokens.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Storefront base URL, e.g. `http://localhost:3000`.
    pub base_url: Url,
    /// Fixed interval of the refresh timer.
    pub refresh_interval: Duration,
}

impl ClientConfig {
    /// Configuration for `base_url` with the default refresh interval.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        })
    }

    #[must_use]
    pub const fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }
}
