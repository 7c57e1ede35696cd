//! Wallet Challenge-Response Authentication
//!
//! Callers prove control of an Ethereum key by signing a server-issued,
//! single-use nonce with `personal_sign` (EIP-191).
//!
//! ## States (per address)
//! - **NoSession**: nothing stored
//! - **NonceIssued**: a live nonce is waiting to be signed
//! - **Authenticated**: a signature over the nonce was verified
//!
//! ## Transitions
//! - any → NonceIssued: `issue_nonce` (replaces any previous nonce)
//! - NonceIssued → Authenticated: `verify` with a matching signature
//! - NonceIssued → NoSession: nonce older than the TTL, or a signature
//!   recovered to a different address
//!
//! Sessions are kept in memory only.

pub mod address;
pub mod error;

pub use address::normalize_address;
pub use error::AuthError;

use alloy_primitives::{Address, Signature};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(5 * 60);

const NONCE_MESSAGE_PREFIX: &str = "Sign this message to authenticate: ";

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// How long an issued nonce stays valid
    pub nonce_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            nonce_ttl: DEFAULT_NONCE_TTL,
        }
    }
}

impl AuthConfig {
    /// Zero falls back to the default TTL.
    pub fn with_nonce_ttl(nonce_ttl: Duration) -> Self {
        if nonce_ttl.is_zero() {
            Self::default()
        } else {
            Self { nonce_ttl }
        }
    }
}

/// Session state for one address
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SessionState {
    NoSession,
    NonceIssued,
    Authenticated,
}

#[derive(Debug)]
struct AuthSession {
    nonce: Option<String>,
    issued_at: Instant,
    authenticated: bool,
    authenticated_at: Option<DateTime<Utc>>,
    chain_id: Option<ChainId>,
}

impl AuthSession {
    fn nonce_expired(&self, ttl: Duration) -> bool {
        self.nonce.is_some() && self.issued_at.elapsed() > ttl
    }
}

/// Chain tag reported by the wallet at sign-in, stored as sent.
///
/// Wallets report either a number or the `eth_chainId` hex string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainId {
    Number(u64),
    Text(String),
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId::Number(id)
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        ChainId::Text(id.to_string())
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainId::Number(id) => write!(f, "{id}"),
            ChainId::Text(id) => f.write_str(id),
        }
    }
}

/// Successful verification
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Authenticated {
    /// EIP-55 checksummed address
    pub address: String,
    pub chain_id: Option<ChainId>,
    pub authenticated_at: DateTime<Utc>,
}

/// Nonce issuance and signature verification keyed by address
pub struct ChallengeAuth {
    sessions: DashMap<Address, AuthSession>,
    config: AuthConfig,
}

impl ChallengeAuth {
    pub fn new() -> Self {
        Self::with_config(AuthConfig::default())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    pub fn nonce_ttl(&self) -> Duration {
        self.config.nonce_ttl
    }

    /// Issue a fresh nonce for `address`, replacing any previous one.
    pub fn issue_nonce(&self, address: &str) -> Result<String, AuthError> {
        let address = normalize_address(address)?;
        let nonce = generate_nonce();

        let mut session = self.sessions.entry(address).or_insert_with(|| AuthSession {
            nonce: None,
            issued_at: Instant::now(),
            authenticated: false,
            authenticated_at: None,
            chain_id: None,
        });
        session.nonce = Some(nonce.clone());
        session.issued_at = Instant::now();
        session.authenticated = false;

        debug!(address = %address, "Issued nonce");
        Ok(nonce)
    }

    /// Check `signature` against the live nonce for `address`.
    ///
    /// The nonce is consumed on success. A signature that recovers to a
    /// different address deletes the session; one that cannot be parsed or
    /// recovered at all leaves it in place.
    pub fn verify(
        &self,
        address: &str,
        signature: &str,
        chain_id: Option<ChainId>,
    ) -> Result<Authenticated, AuthError> {
        let address = normalize_address(address)?;

        // Holding the entry keeps check-and-consume atomic for this address.
        let Entry::Occupied(mut entry) = self.sessions.entry(address) else {
            return Err(AuthError::NonceNotFound);
        };

        if entry.get().nonce_expired(self.config.nonce_ttl) {
            entry.remove();
            debug!(address = %address, "Nonce expired");
            return Err(AuthError::NonceNotFound);
        }
        let Some(nonce) = entry.get().nonce.clone() else {
            return Err(AuthError::NonceNotFound);
        };

        let recovered = recover_signer(&nonce, signature)?;
        if recovered != address {
            entry.remove();
            warn!(
                address = %address,
                recovered = %recovered,
                "Signature does not match wallet address, session cleared"
            );
            return Err(AuthError::AddressMismatch);
        }

        let now = Utc::now();
        let session = entry.get_mut();
        session.nonce = None;
        session.authenticated = true;
        session.authenticated_at = Some(now);
        session.chain_id = chain_id.clone();

        info!(address = %address, chain_id = ?chain_id, "Wallet authenticated");
        Ok(Authenticated {
            address: address.to_checksum(None),
            chain_id,
            authenticated_at: now,
        })
    }

    /// Current state for `address`. Invalid addresses have no session.
    pub fn state(&self, address: &str) -> SessionState {
        let Ok(address) = normalize_address(address) else {
            return SessionState::NoSession;
        };
        match self.sessions.get(&address) {
            None => SessionState::NoSession,
            Some(s) if s.authenticated => SessionState::Authenticated,
            Some(s) if s.nonce.is_some() && !s.nonce_expired(self.config.nonce_ttl) => {
                SessionState::NonceIssued
            }
            Some(_) => SessionState::NoSession,
        }
    }

    pub fn is_authenticated(&self, address: &str) -> bool {
        self.state(address) == SessionState::Authenticated
    }

    /// The completed sign-in for `address`, if any.
    pub fn session(&self, address: &str) -> Result<Option<Authenticated>, AuthError> {
        let address = normalize_address(address)?;
        let Some(session) = self.sessions.get(&address) else {
            return Ok(None);
        };
        Ok(session
            .authenticated_at
            .filter(|_| session.authenticated)
            .map(|authenticated_at| Authenticated {
                address: address.to_checksum(None),
                chain_id: session.chain_id.clone(),
                authenticated_at,
            }))
    }

    /// Drop sessions whose nonce has expired. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.config.nonce_ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.nonce_expired(ttl));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "Purged expired nonces");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for ChallengeAuth {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_nonce() -> String {
    let bytes: [u8; 16] = rand::random();
    format!("{NONCE_MESSAGE_PREFIX}{}", hex::encode(bytes))
}

/// Recover the address that produced an EIP-191 signature over `message`.
fn recover_signer(message: &str, signature: &str) -> Result<Address, AuthError> {
    let raw = signature.trim();
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(raw).map_err(|_| AuthError::SignatureInvalid)?;
    let signature = Signature::try_from(bytes.as_slice()).map_err(|_| AuthError::SignatureInvalid)?;
    signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|_| AuthError::SignatureInvalid)
}
