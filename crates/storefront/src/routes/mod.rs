//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness
//! GET  /health/ready            - Readiness (database ping)
//!
//! # Auth
//! POST /auth/login              - {email, password} -> {user..., token}
//! POST /auth/register           - {email, password, firstName, lastName, phone}
//! POST /auth/logout             - {token} -> {success}
//! POST /auth/refresh            - {token} -> {token} (rotates)
//! POST /auth/validate           - {token} -> {user..., token}
//! POST /auth/restore-session    - {userId|email, password?} -> {user..., token}
//! POST /auth/verification-code  - {email} -> 202
//! POST /auth/verify-code        - {email, code} -> {valid}
//!
//! # Products
//! GET  /api/products            - Server product file
//! PUT  /api/products            - Replace it (admin bearer token)
//! ```

pub mod auth;
pub mod health;
pub mod products;

use axum::{
    Router,
    extract::FromRequest,
    routing::{get, post},
};

use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// JSON body extractor whose rejections use the `{"error": ...}` shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
        .route("/validate", post(auth::validate))
        .route("/restore-session", post(auth::restore_session))
        .route("/verification-code", post(auth::send_verification_code))
        .route("/verify-code", post(auth::verify_code))
}

/// Create the product API router.
pub fn product_routes() -> Router<AppState> {
    Router::new().route("/api/products", get(products::index).put(products::replace))
}

fn compose(auth: Router<AppState>, api: Router<AppState>) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth)
        .merge(api)
}

/// All routes, without rate limiting.
pub fn routes() -> Router<AppState> {
    compose(auth_routes(), product_routes())
}

/// All routes with per-IP rate limits on auth and the product API.
pub fn rate_limited_routes() -> Router<AppState> {
    compose(
        auth_routes().layer(auth_rate_limiter()),
        product_routes().layer(api_rate_limiter()),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use bazaar_core::api::{ErrorResponse, SuccessResponse, TokenResponse, VerifyCodeResponse};
    use bazaar_core::{Email, Product, SessionToken, UserId};

    use super::*;
    use crate::state::tests::test_state;

    struct Harness {
        state: AppState,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                state: test_state(dir.path()),
                _dir: dir,
            }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            bearer: Option<&SessionToken>,
            body: Option<Value>,
        ) -> (StatusCode, Vec<u8>) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = bearer {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token.as_str()));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = routes()
                .with_state(self.state.clone())
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, bytes.to_vec())
        }

        async fn post_json<T: DeserializeOwned>(&self, uri: &str, body: Value) -> (StatusCode, T) {
            let (status, bytes) = self.send(Method::POST, uri, None, Some(body)).await;
            (status, serde_json::from_slice(&bytes).unwrap())
        }
    }

    #[tokio::test]
    async fn test_health() {
        let harness = Harness::new();
        let (status, body) = harness.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let harness = Harness::new();
        let old = harness.state.sessions().create_session(UserId::new(1), false);

        let (status, fresh): (_, TokenResponse) = harness
            .post_json("/auth/refresh", json!({"token": old}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(fresh.token, old);
        assert_eq!(
            harness.state.sessions().verify_session(&fresh.token),
            Some(UserId::new(1))
        );

        let (status, error): (_, ErrorResponse) = harness
            .post_json("/auth/refresh", json!({"token": old}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error.error, "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let harness = Harness::new();
        let token = harness.state.sessions().create_session(UserId::new(2), false);

        for _ in 0..2 {
            let (status, body): (_, SuccessResponse) = harness
                .post_json("/auth/logout", json!({"token": token}))
                .await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.success);
        }
        assert_eq!(harness.state.sessions().verify_session(&token), None);
    }

    #[tokio::test]
    async fn test_validate_unknown_token() {
        let harness = Harness::new();
        let (status, _): (_, ErrorResponse) = harness
            .post_json("/auth/validate", json!({"token": "bogus"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let harness = Harness::new();
        let (status, body) = harness
            .send(Method::POST, "/auth/login", None, Some(json!({"email": 5})))
            .await;
        assert!(status.is_client_error());
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!error.error.is_empty());
    }

    #[tokio::test]
    async fn test_verification_code_flow() {
        let harness = Harness::new();
        let (status, _): (_, SuccessResponse) = harness
            .post_json("/auth/verification-code", json!({"email": "shopper@example.com"}))
            .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        // Replace the random code with a known one.
        let email = Email::parse("shopper@example.com").unwrap();
        harness.state.codes().store(&email, "424242").await;

        let (_, wrong): (_, VerifyCodeResponse) = harness
            .post_json("/auth/verify-code", json!({"email": "shopper@example.com", "code": "000000"}))
            .await;
        assert!(!wrong.valid);

        let (_, right): (_, VerifyCodeResponse) = harness
            .post_json("/auth/verify-code", json!({"email": "Shopper@Example.com", "code": "424242"}))
            .await;
        assert!(right.valid);

        let (_, reused): (_, VerifyCodeResponse) = harness
            .post_json("/auth/verify-code", json!({"email": "shopper@example.com", "code": "424242"}))
            .await;
        assert!(!reused.valid);
    }

    #[tokio::test]
    async fn test_verification_code_rejects_bad_email() {
        let harness = Harness::new();
        let (status, _): (_, ErrorResponse) = harness
            .post_json("/auth/verification-code", json!({"email": "nope"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_product_writes_require_admin() {
        let harness = Harness::new();
        let payload = json!([{"id": 1, "name": "Tee"}]);

        let (status, _) = harness
            .send(Method::PUT, "/api/products", None, Some(payload.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let customer = harness.state.sessions().create_session(UserId::new(5), false);
        let (status, _) = harness
            .send(Method::PUT, "/api/products", Some(&customer), Some(payload))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_replaces_product_file() {
        let harness = Harness::new();
        let admin = harness.state.sessions().create_session(UserId::new(1), true);

        let (status, body) = harness
            .send(
                Method::PUT,
                "/api/products",
                Some(&admin),
                Some(json!([{"id": 1, "name": "Tee"}, {"name": "orphan"}, {"id": 2}])),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let stored: Vec<Product> = serde_json::from_slice(&body).unwrap();
        assert_eq!(stored.len(), 2);

        let (status, body) = harness.send(Method::GET, "/api/products", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let listed: Vec<Product> = serde_json::from_slice(&body).unwrap();
        assert_eq!(listed, stored);

        let (status, _) = harness
            .send(Method::PUT, "/api/products", Some(&admin), Some(json!({"id": 1})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
