//! Poller status handler

use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /sync/status - Cursor position and cycle counters
pub async fn sync_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.sync_status() {
        Some(status) => Json(json!({ "enabled": true, "status": status })),
        None => Json(json!({ "enabled": false })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_sync::ProposalStore;
    use wallet_auth::ChallengeAuth;

    #[tokio::test]
    async fn test_disabled_poller() {
        let state = Arc::new(AppState::new(
            Arc::new(ProposalStore::new()),
            Arc::new(ChallengeAuth::new()),
        ));
        let Json(body) = sync_status(State(state)).await;
        assert_eq!(body, json!({ "enabled": false }));
    }
}
