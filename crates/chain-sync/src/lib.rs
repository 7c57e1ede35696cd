//! Chain State Synchronization
//!
//! Mirrors governance proposals held by an EVM contract into a local,
//! volatile store. Provides:
//! - Block range bookkeeping with a cursor that never moves backwards
//! - Concurrent multi-kind event fetch with fixed-order dispatch
//! - Snapshot-based reconciliation (idempotent under retries)
//! - A periodic scheduler with a reentrancy guard and per-cycle deadline
//!
//! ## Ordering
//!
//! Within one cycle all `created` events are applied before any `voted`
//! event, then `executed`, then `finalized`, regardless of the block each
//! was emitted in. This is only safe because every event triggers a fresh
//! canonical snapshot read; the event payload never supplies votes, flags
//! or descriptions.
//!
//! ## Failure handling
//!
//! A failing cycle leaves the cursor untouched, so the same range is
//! scanned again on the next tick. Re-applying events converges to the same
//! store state.

pub mod config;
pub mod cursor;
pub mod demux;
pub mod engine;
pub mod error;
pub mod reconciler;
pub mod rpc;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{parse_event_kinds, SyncConfig};
pub use cursor::{BlockRangeCursor, ScanPlan};
pub use demux::{EventBatch, EventDemultiplexer};
pub use engine::{CycleOutcome, SyncEngine, SyncStatus};
pub use error::{SyncError, SyncResult};
pub use reconciler::SnapshotReconciler;
pub use rpc::{RpcClient, RpcEventSource};
pub use scheduler::PollScheduler;
pub use source::EventSource;
pub use store::{ProposalRecord, ProposalStore, ProposalUpdate};
pub use types::*;

use std::sync::Arc;

/// Wire the RPC source, engine and scheduler for `config` on top of `store`.
///
/// The scheduler is returned stopped; call [`PollScheduler::start`].
pub fn build_poller(config: &SyncConfig, store: Arc<ProposalStore>) -> SyncResult<PollScheduler> {
    let source = RpcEventSource::new(
        &config.rpc_url,
        config.contract_address,
        config.event_kinds.iter().copied(),
    )?;
    let engine = SyncEngine::new(Arc::new(source), store, config.start_position)
        .with_cycle_timeout(config.cycle_timeout);
    Ok(PollScheduler::new(Arc::new(engine), config.poll_interval))
}
