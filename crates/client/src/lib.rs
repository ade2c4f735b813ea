//! Bazaar storefront client.
//!
//! The pieces a browser front end would run, expressed as a library:
//!
//! - [`storage`] - `localStorage` emulation: tabs sharing one backend,
//!   cross-tab `storage` events, optional file persistence
//! - [`auth`] - Auth context state machine with token rotation and restore
//! - [`products`] - Dual-store product synchronizer (local first, server later)
//! - [`http`] - reqwest adapters for the storefront API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod products;
pub mod storage;

pub use auth::{AuthClient, AuthState, Route};
pub use config::ClientConfig;
pub use error::{ClientError, SyncError};
pub use http::{ApiClient, AuthApi, HttpAuthApi, HttpProductRemote, ProductRemote};
pub use products::{ProductSync, Subscription};
pub use storage::{
    ListenerId, LocalStorage, PageEvent, StorageBackend, StorageError, StorageEvent,
};
