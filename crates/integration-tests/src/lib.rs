//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! # Prepare the database and the development admin account
//! cargo run -p bazaar-cli -- migrate
//! cargo run -p bazaar-cli -- admin create -e admin@example.com -p admin123
//!
//! # Start the storefront
//! cargo run -p bazaar-storefront
//!
//! # Run integration tests
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `auth_sessions` - Login, rotation, logout and restore over HTTP
//! - `product_sync` - Client product synchronizer against the server file

use reqwest::Client;

use bazaar_client::ClientConfig;

/// Credentials of the development admin account.
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin123";

/// Base URL for the storefront (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// Client configuration pointed at [`storefront_base_url`].
///
/// # Panics
///
/// Panics if `STOREFRONT_BASE_URL` is not a valid URL.
#[must_use]
pub fn client_config() -> ClientConfig {
    ClientConfig::new(&storefront_base_url()).expect("STOREFRONT_BASE_URL is not a valid URL")
}

/// Plain HTTP client for raw endpoint checks.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized.
#[must_use]
pub fn http_client() -> Client {
    Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}

/// A unique address for accounts created by a test run.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", uuid::Uuid::new_v4().simple())
}
