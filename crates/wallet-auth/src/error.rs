/// Rejections returned to the caller of the authentication flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid wallet address")]
    InvalidAddress,

    #[error("Nonce not found or expired. Request a new one.")]
    NonceNotFound,

    #[error("Failed to verify signature")]
    SignatureInvalid,

    #[error("Signature does not match the wallet address")]
    AddressMismatch,
}
