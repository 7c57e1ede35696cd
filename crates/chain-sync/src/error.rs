//! Synchronization errors

use std::time::Duration;

/// Errors raised while mirroring contract state.
///
/// None of these are fatal to the host process: a failed cycle is logged and
/// retried on the next tick with the cursor left where it was.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Required configuration is absent; the poller stays disabled.
    #[error("missing configuration: {0}")]
    ConfigMissing(&'static str),

    /// Transport-level failure talking to the upstream node.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// An event or snapshot could not be decoded into the expected shape.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The cycle exceeded its deadline.
    #[error("sync cycle exceeded deadline of {0:?}")]
    CycleTimeout(Duration),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::UpstreamUnavailable(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
