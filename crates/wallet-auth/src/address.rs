//! Wallet address normalization

use crate::error::AuthError;
use alloy_primitives::Address;

/// Parse a user-supplied address.
///
/// Accepts 40 hex characters with or without `0x`. All-lowercase and
/// all-uppercase input is taken as-is; mixed case must carry a valid EIP-55
/// checksum.
pub fn normalize_address(raw: &str) -> Result<Address, AuthError> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AuthError::InvalidAddress);
    }

    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    let prefixed = format!("0x{hex}");

    if has_lower && has_upper {
        Address::parse_checksummed(&prefixed, None).map_err(|_| AuthError::InvalidAddress)
    } else {
        prefixed.parse().map_err(|_| AuthError::InvalidAddress)
    }
}
