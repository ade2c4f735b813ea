//! Bearer-token extractors.
//!
//! Protected handlers take [`RequireSession`] (any live token) or
//! [`RequireAdmin`] (a live token issued to an admin). Each successful
//! extraction records activity on the token.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use bazaar_core::{SessionToken, UserId};

use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: SessionToken,
    pub user_id: UserId,
    pub is_admin: bool,
}

/// Extractor that requires a live bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireSession(session): RequireSession,
/// ) -> impl IntoResponse {
///     format!("Hello, user {}!", session.user_id)
/// }
/// ```
pub struct RequireSession(pub CurrentSession);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_owned()))?;

        let sessions = state.sessions();
        let record = sessions
            .session(&token)
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_owned()))?;
        sessions.update_session_activity(&token);

        Ok(Self(CurrentSession {
            token,
            user_id: record.user_id,
            is_admin: record.is_admin,
        }))
    }
}

/// Extractor that requires a live bearer token belonging to an admin.
pub struct RequireAdmin(pub CurrentSession);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireSession(session) = RequireSession::from_request_parts(parts, state).await?;
        if !session.is_admin {
            return Err(AppError::Forbidden("Admin access required".to_owned()));
        }
        Ok(Self(session))
    }
}

/// Parse `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<SessionToken> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = SessionToken::from(token.trim());
    (!token.is_blank()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/products");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(
            bearer_token(&parts_with(Some("Bearer abc123"))),
            Some(SessionToken::from("abc123"))
        );
        assert_eq!(
            bearer_token(&parts_with(Some("bearer   abc123 "))),
            Some(SessionToken::from("abc123"))
        );
        assert_eq!(bearer_token(&parts_with(Some("Basic abc123"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[tokio::test]
    async fn test_require_session_bumps_activity() {
        let dir = tempfile::tempdir().unwrap();
        let state = crate::state::tests::test_state(dir.path());
        let token = state.sessions().create_session(UserId::new(4), false);
        let created = state.sessions().session(&token).unwrap().last_activity;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let header = format!("Bearer {}", token.as_str());
        let RequireSession(session) =
            RequireSession::from_request_parts(&mut parts_with(Some(&header)), &state)
                .await
                .unwrap();

        assert_eq!(session.user_id, UserId::new(4));
        assert!(state.sessions().session(&token).unwrap().last_activity > created);
    }

    #[tokio::test]
    async fn test_require_admin_rejects_customers() {
        let dir = tempfile::tempdir().unwrap();
        let state = crate::state::tests::test_state(dir.path());
        let token = state.sessions().create_session(UserId::new(5), false);
        let header = format!("Bearer {}", token.as_str());

        let result = RequireAdmin::from_request_parts(&mut parts_with(Some(&header)), &state).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let result = RequireAdmin::from_request_parts(&mut parts_with(None), &state).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
