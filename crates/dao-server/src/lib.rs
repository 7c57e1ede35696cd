//! DAO Server
//!
//! Thin HTTP surface over the proposal mirror and wallet sign-in:
//! - `GET  /health`
//! - `GET  /proposals`, `GET /proposals/:id`
//! - `GET  /auth/nonce?address=`, `POST /auth/verify`, `GET /auth/session?address=`
//! - `GET  /sync/status`
//!
//! CORS is open to any origin; the dApp frontend is served elsewhere.

pub mod api;
pub mod state;

pub use state::AppState;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/proposals", get(api::proposals::list_proposals))
        .route("/proposals/:id", get(api::proposals::get_proposal))
        .route("/auth/nonce", get(api::auth::request_nonce))
        .route("/auth/verify", post(api::auth::verify_signature))
        .route("/auth/session", get(api::auth::get_session))
        .route("/sync/status", get(api::sync::sync_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
