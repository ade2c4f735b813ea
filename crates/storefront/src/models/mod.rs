//! Domain models for storefront.
//!
//! These are validated domain objects, separate from database row types and
//! from the wire schemas in `bazaar_core::api`.

pub mod user;

pub use user::{NewUser, User};
