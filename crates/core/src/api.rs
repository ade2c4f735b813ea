//! JSON request and response bodies for the storefront API.
//!
//! Field names are camelCase on the wire. Request types deserialize raw
//! strings; validation into [`Email`]/[`Phone`] happens in the auth service
//! so that a malformed field produces a 400 with a specific message instead
//! of a generic body rejection.

use serde::{Deserialize, Serialize};

use crate::types::{Email, SessionToken, UserId};

/// `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// `POST /auth/logout`, `POST /auth/refresh` and `POST /auth/validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub token: SessionToken,
}

/// `POST /auth/restore-session`
///
/// At least one of `user_id` or `email` must be present. `password` is
/// required unless the server trusts identity-only restores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSessionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Client-visible user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Body returned by login, register, validate and restore-session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserProfile,
    pub token: SessionToken,
}

/// Body returned by `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: SessionToken,
}

/// Body returned by `POST /auth/logout` and `POST /auth/verification-code`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// `POST /auth/verification-code`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCodeRequest {
    pub email: String,
}

/// `POST /auth/verify-code`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

/// Body returned by `POST /auth/verify-code`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VerifyCodeResponse {
    pub valid: bool,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
