//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password registration, login and restore-by-identity
//! - `email` - Verification code delivery over SMTP
//! - `verification` - Single-use verification codes

pub mod auth;
pub mod email;
pub mod verification;

pub use auth::{AuthError, AuthService};
pub use email::{EmailService, EmailServiceError};
pub use verification::VerificationCodes;
