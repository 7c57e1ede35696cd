//! Wallet sign-in handlers

use super::{error_response, ApiError};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use wallet_auth::{AuthError, Authenticated, ChainId};

#[derive(Debug, Deserialize)]
pub struct NonceQuery {
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NonceResponse {
    pub nonce: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub address: Option<String>,
    pub signature: Option<String>,
    pub chain_id: Option<ChainId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub address: String,
    pub chain_id: Option<ChainId>,
}

fn auth_error(err: AuthError) -> ApiError {
    let status = match err {
        AuthError::AddressMismatch => StatusCode::UNAUTHORIZED,
        AuthError::InvalidAddress | AuthError::NonceNotFound | AuthError::SignatureInvalid => {
            StatusCode::BAD_REQUEST
        }
    };
    error_response(status, err.to_string())
}

/// GET /auth/nonce?address=0x... - Issue a sign-in challenge
pub async fn request_nonce(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NonceQuery>,
) -> Result<Json<NonceResponse>, ApiError> {
    let address = query.address.unwrap_or_default();
    let nonce = state.auth.issue_nonce(&address).map_err(auth_error)?;
    Ok(Json(NonceResponse { nonce }))
}

/// GET /auth/session?address=0x... - Completed sign-in for an address
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NonceQuery>,
) -> Result<Json<Authenticated>, ApiError> {
    let address = query.address.unwrap_or_default();
    state
        .auth
        .session(&address)
        .map_err(auth_error)?
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Not authenticated"))
}

/// POST /auth/verify - Verify a signed challenge
pub async fn verify_signature(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(req) =
        payload.map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?;
    let address = req.address.unwrap_or_default();
    wallet_auth::normalize_address(&address).map_err(auth_error)?;

    let signature = req
        .signature
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Signature is required"))?;

    let authenticated = state
        .auth
        .verify(&address, &signature, req.chain_id)
        .map_err(|e| {
            debug!(error = %e, "Wallet verification rejected");
            auth_error(e)
        })?;

    Ok(Json(VerifyResponse {
        success: true,
        address: authenticated.address,
        chain_id: authenticated.chain_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use chain_sync::ProposalStore;
    use wallet_auth::ChallengeAuth;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(
            Arc::new(ProposalStore::new()),
            Arc::new(ChallengeAuth::new()),
        ))
    }

    fn wallet() -> PrivateKeySigner {
        "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
            .parse()
            .unwrap()
    }

    async fn nonce_for(state: &Arc<AppState>, address: &str) -> String {
        let Json(resp) = request_nonce(
            State(state.clone()),
            Query(NonceQuery {
                address: Some(address.to_string()),
            }),
        )
        .await
        .unwrap();
        resp.nonce
    }

    fn signed(signer: &PrivateKeySigner, message: &str) -> String {
        let sig = signer.sign_message_sync(message.as_bytes()).unwrap();
        format!("0x{}", hex::encode(sig.as_bytes()))
    }

    #[test]
    fn test_verify_request_deserialize() {
        let json = r#"{"address":"0xabc","signature":"0x01","chainId":11155111}"#;
        let req: VerifyRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.chain_id, Some(ChainId::Number(11155111)));
        assert_eq!(req.signature.as_deref(), Some("0x01"));
    }

    #[tokio::test]
    async fn test_nonce_requires_valid_address() {
        let (status, Json(body)) = request_nonce(
            State(test_state()),
            Query(NonceQuery { address: None }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid wallet address");
    }

    #[tokio::test]
    async fn test_sign_in_flow() {
        let state = test_state();
        let signer = wallet();
        let address = signer.address().to_checksum(None);

        let nonce = nonce_for(&state, &address).await;
        let signature = signed(&signer, &nonce);
        let request = || VerifyRequest {
            address: Some(address.clone()),
            signature: Some(signature.clone()),
            chain_id: Some(ChainId::Number(1)),
        };

        let Json(resp) = verify_signature(State(state.clone()), Ok(Json(request())))
            .await
            .unwrap();
        assert!(resp.success);
        assert_eq!(resp.address, address);

        let (status, Json(body)) = verify_signature(State(state.clone()), Ok(Json(request())))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Nonce not found or expired. Request a new one.");
    }

    #[tokio::test]
    async fn test_hex_chain_id_is_accepted() {
        let state = test_state();
        let signer = wallet();
        let address = signer.address().to_checksum(None);
        let nonce = nonce_for(&state, &address).await;

        let req: VerifyRequest = serde_json::from_value(serde_json::json!({
            "address": address,
            "signature": signed(&signer, &nonce),
            "chainId": "0xaa36a7",
        }))
        .unwrap();
        let Json(resp) = verify_signature(State(state.clone()), Ok(Json(req)))
            .await
            .unwrap();
        assert!(resp.success);
        assert_eq!(resp.chain_id, Some(ChainId::Text("0xaa36a7".to_string())));

        let Json(session) = get_session(
            State(state.clone()),
            Query(NonceQuery {
                address: Some(address.to_lowercase()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(session.address, address);
        assert_eq!(
            serde_json::to_value(&session).unwrap()["chainId"],
            "0xaa36a7"
        );
    }

    #[tokio::test]
    async fn test_session_requires_sign_in() {
        let state = test_state();
        let address = wallet().address().to_checksum(None);
        nonce_for(&state, &address).await;

        let (status, Json(body)) = get_session(
            State(state),
            Query(NonceQuery {
                address: Some(address),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authenticated");
    }

    #[tokio::test]
    async fn test_missing_signature() {
        let state = test_state();
        let address = wallet().address().to_checksum(None);
        nonce_for(&state, &address).await;

        let (status, Json(body)) = verify_signature(
            State(state),
            Ok(Json(VerifyRequest {
                address: Some(address),
                signature: Some("  ".to_string()),
                chain_id: None,
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Signature is required");
    }

    #[tokio::test]
    async fn test_mismatch_is_unauthorized() {
        let state = test_state();
        let claimed = wallet().address().to_checksum(None);
        let nonce = nonce_for(&state, &claimed).await;

        let other: PrivateKeySigner =
            "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
                .parse()
                .unwrap();

        let (status, _) = verify_signature(
            State(state.clone()),
            Ok(Json(VerifyRequest {
                address: Some(claimed.clone()),
                signature: Some(signed(&other, &nonce)),
                chain_id: None,
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!state.auth.is_authenticated(&claimed));
    }
}
