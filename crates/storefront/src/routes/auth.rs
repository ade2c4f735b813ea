//! Authentication route handlers.
//!
//! Every endpoint speaks JSON. Tokens travel in request bodies; protected
//! product routes take them as `Authorization: Bearer`.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::{info, instrument, warn};

use bazaar_core::api::{
    AuthResponse, LoginRequest, RegisterRequest, RestoreSessionRequest, SuccessResponse,
    TokenRequest, TokenResponse, VerificationCodeRequest, VerifyCodeRequest, VerifyCodeResponse,
};
use bazaar_core::Email;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::models::user::User;
use crate::routes::ApiJson;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Issue a token for `user` and build the login-style response.
fn issue(state: &AppState, user: &User) -> AuthResponse {
    let token = state.sessions().create_session(user.id, user.is_admin);
    set_sentry_user(&user.id, Some(user.email.as_str()));
    AuthResponse {
        user: user.profile(),
        token,
    }
}

/// `POST /auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let users = state.users();
    let user = AuthService::new(&users)
        .login(&request.email, &request.password)
        .await?;

    info!(user_id = %user.id, is_admin = user.is_admin, "User logged in");
    Ok(Json(issue(&state, &user)))
}

/// `POST /auth/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let users = state.users();
    let user = AuthService::new(&users).register(&request).await?;

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(issue(&state, &user))))
}

/// `POST /auth/logout`
///
/// Always succeeds; an unknown token is already logged out.
pub async fn logout(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Json<SuccessResponse> {
    state.sessions().remove_session(&request.token);
    clear_sentry_user();
    Json(SuccessResponse { success: true })
}

/// `POST /auth/refresh`
///
/// Rotates the token: the old value stops working immediately.
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Result<Json<TokenResponse>> {
    let token = state
        .sessions()
        .rotate_session(&request.token)
        .ok_or(AuthError::InvalidToken)?;
    Ok(Json(TokenResponse { token }))
}

/// `POST /auth/validate`
///
/// Resolves a token to its user. Counts as activity on the token.
#[instrument(skip_all)]
pub async fn validate(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Result<Json<AuthResponse>> {
    let sessions = state.sessions();
    let user_id = sessions
        .verify_session(&request.token)
        .ok_or(AuthError::InvalidToken)?;

    let users = state.users();
    let user = match AuthService::new(&users).get_user(user_id).await {
        Ok(user) => user,
        Err(AuthError::UserNotFound) => {
            // Account deleted while the token was live.
            sessions.remove_session(&request.token);
            return Err(AuthError::InvalidToken.into());
        }
        Err(e) => return Err(e.into()),
    };
    sessions.update_session_activity(&request.token);

    Ok(Json(AuthResponse {
        user: user.profile(),
        token: request.token,
    }))
}

/// `POST /auth/restore-session`
#[instrument(skip_all)]
pub async fn restore_session(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RestoreSessionRequest>,
) -> Result<Json<AuthResponse>> {
    let allow_identity_only = state.config().session.allow_identity_restore;
    let users = state.users();
    let user = AuthService::new(&users)
        .restore(&request, allow_identity_only)
        .await?;

    info!(user_id = %user.id, "Session restored");
    Ok(Json(issue(&state, &user)))
}

/// `POST /auth/verification-code`
///
/// Stores a fresh code and sends it in the background; delivery failures
/// are logged, never returned.
pub async fn send_verification_code(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerificationCodeRequest>,
) -> Result<(StatusCode, Json<SuccessResponse>)> {
    let email = Email::parse(&request.email).map_err(AuthError::from)?;
    let code = state.codes().issue(&email).await;

    let mailer = state.email().clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_verification_code(&email, &code).await {
            warn!(error = %e, to = %email, "Failed to send verification code");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(SuccessResponse { success: true })))
}

/// `POST /auth/verify-code`
pub async fn verify_code(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>> {
    let email = Email::parse(&request.email).map_err(AuthError::from)?;
    let valid = state.codes().verify(&email, &request.code).await;
    Ok(Json(VerifyCodeResponse { valid }))
}
