//! Upstream event source abstraction

use crate::error::SyncResult;
use crate::types::{BlockPosition, ChainEvent, EventKind, ProposalId, ProposalSnapshot};
use async_trait::async_trait;

/// Read-only view of the authoritative, append-only event log.
///
/// The source is trusted: whatever it reports is mirrored as-is.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Current tip of the log.
    async fn current_position(&self) -> SyncResult<BlockPosition>;

    /// Whether this source can be queried for `kind` at all. Unsupported
    /// kinds are treated as producing no events.
    fn supports(&self, _kind: EventKind) -> bool {
        true
    }

    /// All events of `kind` in the inclusive range `[from, to]`, in the
    /// order the source reports them.
    async fn query_events(
        &self,
        kind: EventKind,
        from: BlockPosition,
        to: BlockPosition,
    ) -> SyncResult<Vec<ChainEvent>>;

    /// Full current state of a proposal, independent of any event payload.
    async fn canonical_snapshot(&self, id: ProposalId) -> SyncResult<ProposalSnapshot>;
}
