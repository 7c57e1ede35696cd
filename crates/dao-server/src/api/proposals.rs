//! Proposal API handlers
//!
//! Read-only projections of the mirrored store.

use super::{error_response, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chain_sync::{ProposalId, ProposalRecord};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ProposalList {
    pub total: usize,
    pub proposals: Vec<ProposalRecord>,
}

/// GET /proposals - All mirrored proposals
pub async fn list_proposals(State(state): State<Arc<AppState>>) -> Json<ProposalList> {
    let proposals = state.proposals.get_all();
    Json(ProposalList {
        total: proposals.len(),
        proposals,
    })
}

/// GET /proposals/:id - Single proposal
pub async fn get_proposal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ProposalId>,
) -> Result<Json<ProposalRecord>, ApiError> {
    state
        .proposals
        .get_by_id(id)
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Proposal {id} not found")))
}
