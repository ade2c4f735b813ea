//! Client auth context.
//!
//! ```text
//!                 init (token persisted)           validate ok
//! Unauthenticated ───────────────────▶ Authenticating ──────────▶ Authenticated
//!        ▲                                   │                        │
//!        └──────── validate fails ───────────┘                        │
//!        └──────────── logout / terminal refresh failure ─────────────┘
//! ```
//!
//! The token lives in local storage under `auth_token`, next to the
//! `last_user_id` / `last_user_email` pointers used to restore a session
//! by identity. The profile itself is never trusted from storage; it always
//! comes back from the server. While authenticated a timer rotates the token
//! on a fixed interval.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use bazaar_core::api::{AuthResponse, LoginRequest, RegisterRequest, RestoreSessionRequest, UserProfile};
use bazaar_core::{SessionToken, UserId};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::AuthApi;
use crate::storage::{LocalStorage, StorageError, log_write_failure};

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const LAST_USER_ID_KEY: &str = "last_user_id";
pub const LAST_USER_EMAIL_KEY: &str = "last_user_email";

/// Where the auth context currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    /// A persisted token or identity is being checked with the server.
    Authenticating,
    Authenticated(UserProfile),
}

impl AuthState {
    #[must_use]
    pub const fn user(&self) -> Option<&UserProfile> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Where the front end navigates after an auth action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Admin,
    Home,
}

impl Route {
    #[must_use]
    pub const fn for_user(user: &UserProfile) -> Self {
        if user.is_admin { Self::Admin } else { Self::Home }
    }

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Home => "/",
        }
    }
}

/// The auth context of one tab.
///
/// Cheap to clone; clones share state, storage and the refresh timer.
pub struct AuthClient<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for AuthClient<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<A> {
    api: A,
    storage: LocalStorage,
    refresh_interval: Duration,
    state: watch::Sender<AuthState>,
    /// Serializes transitions so a timer refresh cannot interleave with logout.
    transitions: tokio::sync::Mutex<()>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<A> Drop for Inner<A> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .timer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl<A> std::fmt::Debug for AuthClient<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("state", &*self.inner.state.borrow())
            .field("refresh_interval", &self.inner.refresh_interval)
            .finish_non_exhaustive()
    }
}

impl<A: AuthApi> AuthClient<A> {
    #[must_use]
    pub fn new(api: A, storage: LocalStorage, config: &ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                storage,
                refresh_interval: config.refresh_interval,
                state: watch::Sender::new(AuthState::Unauthenticated),
                transitions: tokio::sync::Mutex::new(()),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Observe state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// The persisted token, if any.
    #[must_use]
    pub fn token(&self) -> Option<SessionToken> {
        self.inner
            .storage
            .get_item(AUTH_TOKEN_KEY)
            .map(SessionToken::new)
    }

    /// Mount: validate a persisted token, if there is one.
    pub async fn init(&self) -> AuthState {
        let _guard = self.inner.transitions.lock().await;
        if self.token().is_some() {
            self.validate_locked().await;
        } else {
            self.set_state(AuthState::Unauthenticated);
        }
        self.state()
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection (401 for bad credentials) or a
    /// transport error. The previous state is kept on failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<Route, ClientError> {
        let request = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let _guard = self.inner.transitions.lock().await;
        let response = self.inner.api.login(&request).await?;
        Ok(self.commit(response)?)
    }

    /// Register a new account and log in as it.
    ///
    /// # Errors
    ///
    /// Returns 400 for validation failures and 409 for a taken email.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Route, ClientError> {
        let _guard = self.inner.transitions.lock().await;
        let response = self.inner.api.register(request).await?;
        Ok(self.commit(response)?)
    }

    /// Log out locally and, best effort, on the server.
    pub async fn logout(&self) -> Route {
        let _guard = self.inner.transitions.lock().await;
        self.disarm_timer();

        if let Some(token) = self.token()
            && let Err(e) = self.inner.api.logout(&token).await
        {
            warn!(error = %e, "Server logout failed; clearing local session anyway");
        }

        let storage = &self.inner.storage;
        for key in [AUTH_TOKEN_KEY, LAST_USER_ID_KEY, LAST_USER_EMAIL_KEY] {
            log_write_failure(key, storage.remove_item(key));
        }
        self.set_state(AuthState::Unauthenticated);
        info!("Logged out");
        Route::Home
    }

    /// Rotate the token.
    ///
    /// A 401 is terminal: the token is dropped and one restore-by-identity
    /// is attempted. Any other failure leaves the session untouched so the
    /// next tick can retry.
    ///
    /// # Errors
    ///
    /// Returns the refresh error unless a fallback restore succeeded.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let _guard = self.inner.transitions.lock().await;
        self.refresh_locked().await
    }

    /// Restore the remembered identity, re-authenticating with `password`.
    ///
    /// For storefronts that refuse identity-only restores: when focus or a
    /// terminal refresh ends in a 401 while an identity is still remembered,
    /// the UI can prompt for the password and call this.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoRememberedIdentity`] if no user is remembered,
    /// otherwise the server's rejection (401 for a wrong password).
    pub async fn restore_with_password(&self, password: &str) -> Result<Route, ClientError> {
        let _guard = self.inner.transitions.lock().await;
        self.restore_locked(Some(password))
            .await?
            .ok_or(ClientError::NoRememberedIdentity)
    }

    /// Window regained focus.
    ///
    /// A persisted token is validated first; if the server rejects it, the
    /// remembered identity is restored in the same transition.
    pub async fn on_focus(&self) -> AuthState {
        if !matches!(self.state(), AuthState::Unauthenticated) {
            return self.state();
        }

        let _guard = self.inner.transitions.lock().await;
        if matches!(self.state(), AuthState::Unauthenticated) {
            let restore = match self.token() {
                Some(_) => self.validate_locked().await == Validation::Rejected,
                None => true,
            };
            if restore && let Err(e) = self.restore_locked(None).await {
                debug!(error = %e, "Restore on focus failed");
            }
        }
        self.state()
    }

    /// Page visibility changed.
    pub async fn on_visibility_change(&self, visible: bool) -> AuthState {
        if visible {
            self.on_focus().await
        } else {
            self.state()
        }
    }

    async fn validate_locked(&self) -> Validation {
        let Some(token) = self.token() else {
            return Validation::Unavailable;
        };
        self.set_state(AuthState::Authenticating);

        match self.inner.api.validate(&token).await {
            Ok(response) => {
                if let Err(e) = self.commit(response) {
                    warn!(error = %e, "Could not persist validated session");
                }
                Validation::Accepted
            }
            Err(e) if e.is_unauthorized() => {
                debug!("Persisted token rejected; discarding");
                self.drop_session();
                Validation::Rejected
            }
            Err(e) => {
                warn!(error = %e, "Could not validate persisted token");
                self.set_state(AuthState::Unauthenticated);
                Validation::Unavailable
            }
        }
    }

    async fn refresh_locked(&self) -> Result<(), ClientError> {
        let Some(token) = self.token() else {
            return Ok(());
        };

        match self.inner.api.refresh(&token).await {
            Ok(fresh) => {
                if let Err(e) = self.inner.storage.set_item(AUTH_TOKEN_KEY, fresh.as_str()) {
                    // The server already retired the old token.
                    warn!(error = %e, "Could not persist rotated token; restoring by identity");
                    self.drop_session();
                    return self.restore_locked(None).await.map(drop);
                }
                debug!(token = fresh.fingerprint(), "Token rotated");
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                info!("Refresh rejected; attempting restore");
                self.drop_session();
                match self.restore_locked(None).await {
                    Ok(Some(_)) => Ok(()),
                    Ok(None) | Err(_) => Err(e),
                }
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed; will retry");
                Err(e)
            }
        }
    }

    /// Returns `Ok(None)` when no identity is remembered.
    async fn restore_locked(&self, password: Option<&str>) -> Result<Option<Route>, ClientError> {
        let storage = &self.inner.storage;
        let user_id = storage
            .get_item(LAST_USER_ID_KEY)
            .and_then(|raw| raw.parse::<UserId>().ok());
        let email = storage.get_item(LAST_USER_EMAIL_KEY);
        if user_id.is_none() && email.is_none() {
            return Ok(None);
        }

        self.set_state(AuthState::Authenticating);
        let request = RestoreSessionRequest {
            user_id,
            email,
            password: password.map(str::to_owned),
        };

        match self.inner.api.restore(&request).await {
            Ok(response) => {
                let route = self.commit(response)?;
                info!(reauthenticated = password.is_some(), "Session restored by identity");
                Ok(Some(route))
            }
            Err(e) => {
                if e.is_not_found() {
                    for key in [LAST_USER_ID_KEY, LAST_USER_EMAIL_KEY] {
                        log_write_failure(key, storage.remove_item(key));
                    }
                }
                self.set_state(AuthState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Forget the token, keeping the identity pointers.
    ///
    /// Leaves the timer alone: this runs on the timer task itself, and the
    /// loop exits on its next tick once the state is no longer authenticated.
    fn drop_session(&self) {
        log_write_failure(AUTH_TOKEN_KEY, self.inner.storage.remove_item(AUTH_TOKEN_KEY));
        self.set_state(AuthState::Unauthenticated);
    }

    fn commit(&self, response: AuthResponse) -> Result<Route, StorageError> {
        let storage = &self.inner.storage;
        storage.set_item(AUTH_TOKEN_KEY, response.token.as_str())?;
        storage.set_item(LAST_USER_ID_KEY, &response.user.id.to_string())?;
        storage.set_item(LAST_USER_EMAIL_KEY, response.user.email.as_str())?;

        let route = Route::for_user(&response.user);
        self.set_state(AuthState::Authenticated(response.user));
        self.arm_timer();
        Ok(route)
    }

    fn set_state(&self, state: AuthState) {
        self.inner.state.send_replace(state);
    }

    fn arm_timer(&self) {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.refresh_interval;
        let handle = tokio::spawn(refresh_loop(weak, period));

        let previous = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn disarm_timer(&self) {
        let previous = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Validation {
    Accepted,
    /// The server answered 401; the token has been discarded.
    Rejected,
    /// No token, or the server could not be reached.
    Unavailable,
}

async fn refresh_loop<A: AuthApi>(weak: Weak<Inner<A>>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let client = AuthClient { inner };
        if !client.state().is_authenticated() {
            return;
        }
        if let Err(e) = client.refresh().await {
            debug!(error = %e, "Scheduled refresh failed");
        }
    }
}
