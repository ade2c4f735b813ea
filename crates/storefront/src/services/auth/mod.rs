//! Authentication service.
//!
//! Password registration, login, and restore-by-identity. Token issuance is
//! left to [`crate::session::SessionManager`]; this service only answers
//! "which user is this?".

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{instrument, warn};

use bazaar_core::api::{RegisterRequest, RestoreSessionRequest};
use bazaar_core::{Email, Phone, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::user::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service over any [`UserStore`].
pub struct AuthService<'a, U> {
    users: &'a U,
}

impl<'a, U: UserStore> AuthService<'a, U> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a U) -> Self {
        Self { users }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if a name is blank.
    /// Returns `AuthError::InvalidEmail` / `InvalidPhone` on malformed input.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AuthError> {
        let new_user = NewUser {
            email: Email::parse(&request.email)?,
            first_name: required(&request.first_name, "firstName")?,
            last_name: required(&request.last_name, "lastName")?,
            phone: Phone::parse(&request.phone)?,
            is_admin: false,
        };
        self.create_user(&new_user, &request.password).await
    }

    /// Insert an already-validated account with a password.
    ///
    /// Used by registration and by the CLI to provision admins.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` or `AuthError::UserAlreadyExists`.
    pub async fn create_user(&self, user: &NewUser, password: &str) -> Result<User, AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.users
            .create_with_password(user, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        // A malformed email can't match an account; don't reveal which part failed.
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Resolve the user behind a restore-session request.
    ///
    /// The user is looked up by id, falling back to email. With
    /// `allow_identity_only` the identity alone suffices; otherwise the
    /// password must be supplied and must match.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if neither id nor email is present.
    /// Returns `AuthError::UserNotFound` for an unknown identity.
    /// Returns `AuthError::ReauthenticationRequired` or
    /// `AuthError::InvalidCredentials` when the password check fails.
    #[instrument(skip_all, fields(user_id = ?request.user_id))]
    pub async fn restore(
        &self,
        request: &RestoreSessionRequest,
        allow_identity_only: bool,
    ) -> Result<User, AuthError> {
        let user = self.find_by_identity(request).await?;

        match request.password.as_deref() {
            Some(password) if !password.is_empty() => {
                let (_, password_hash) = self
                    .users
                    .get_password_hash(&user.email)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;
                verify_password(password, &password_hash)?;
            }
            _ if allow_identity_only => {
                warn!(user_id = %user.id, "Restoring session from identity alone");
            }
            _ => return Err(AuthError::ReauthenticationRequired),
        }

        Ok(user)
    }

    async fn find_by_identity(&self, request: &RestoreSessionRequest) -> Result<User, AuthError> {
        if let Some(user_id) = request.user_id
            && let Some(user) = self.users.get_by_id(user_id).await?
        {
            return Ok(user);
        }

        match request.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => {
                let email = Email::parse(email)?;
                self.users
                    .get_by_email(&email)
                    .await?
                    .ok_or(AuthError::UserNotFound)
            }
            _ if request.user_id.is_some() => Err(AuthError::UserNotFound),
            _ => Err(AuthError::MissingField("userId or email")),
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(trimmed.to_owned())
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
