//! Bazaar Core - Shared types library.
//!
//! This crate provides common types used across all Bazaar components:
//! - `storefront` - HTTP server issuing sessions and serving the product file
//! - `client` - Client-side auth context and product synchronizer
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. Request and response bodies exchanged between the
//! storefront and the client live in [`api`] so both sides agree on the wire
//! format.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, phone numbers, session tokens and products
//! - [`api`] - JSON request/response schemas for the auth and product endpoints

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod types;

pub use types::*;
