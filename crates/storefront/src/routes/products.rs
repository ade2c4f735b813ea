//! Product file API.
//!
//! The server copy is the reconciliation point for clients' local stores.
//! Reads are public; replacing the list needs an admin token.

use axum::{Json, extract::State};
use serde_json::Value;
use tracing::info;

use bazaar_core::Product;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::ApiJson;
use crate::state::AppState;

/// `GET /api/products`
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.products().load().await?))
}

/// `PUT /api/products`
///
/// Replaces the whole list. Malformed entries are dropped; the response is
/// what was actually stored.
pub async fn replace(
    State(state): State<AppState>,
    RequireAdmin(session): RequireAdmin,
    ApiJson(payload): ApiJson<Value>,
) -> Result<Json<Vec<Product>>> {
    let stored = state.products().replace_all(payload).await?;
    info!(user_id = %session.user_id, count = stored.len(), "Product file replaced");
    Ok(Json(stored))
}
