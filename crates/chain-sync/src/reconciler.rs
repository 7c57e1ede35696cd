//! Snapshot-based reconciliation of events into the store

use crate::error::SyncResult;
use crate::source::EventSource;
use crate::store::{ProposalRecord, ProposalStore, ProposalUpdate};
use crate::types::{ChainEvent, EventPayload, ProposalSnapshot};
use std::sync::Arc;
use tracing::info;

/// Folds events into the [`ProposalStore`] by refetching canonical state.
///
/// Mutable fields (votes, flags, description) always come from a fresh
/// snapshot, never from the event payload, so applying an event twice
/// converges to the same record. The event only contributes the acting
/// identity (creator, voter, executor, finalizer).
pub struct SnapshotReconciler {
    source: Arc<dyn EventSource>,
    store: Arc<ProposalStore>,
}

impl SnapshotReconciler {
    pub fn new(source: Arc<dyn EventSource>, store: Arc<ProposalStore>) -> Self {
        Self { source, store }
    }

    pub async fn apply(&self, event: &ChainEvent) -> SyncResult<ProposalRecord> {
        let snapshot = self.source.canonical_snapshot(event.proposal_id).await?;
        let update = build_update(event, &snapshot);
        let record = self.store.upsert(update);

        info!(
            proposal_id = event.proposal_id,
            kind = %event.kind(),
            block = event.position,
            votes_for = %record.votes_for,
            votes_against = %record.votes_against,
            "Reconciled proposal"
        );

        Ok(record)
    }
}

fn build_update(event: &ChainEvent, snapshot: &ProposalSnapshot) -> ProposalUpdate {
    let mut update = ProposalUpdate {
        id: event.proposal_id,
        description: Some(snapshot.description.clone()),
        executed: snapshot.executed.then_some(true),
        finalized: snapshot.finalized.then_some(true),
        votes_for: Some(snapshot.votes_for.to_string()),
        votes_against: Some(snapshot.votes_against.to_string()),
        created_at: Some(snapshot.created_at),
        ..Default::default()
    };

    match &event.payload {
        EventPayload::Created { creator, .. } => {
            update.creator = Some(creator.to_checksum(None));
        }
        EventPayload::Voted { voter, support, .. } => {
            update.last_voter = Some(voter.to_checksum(None));
            update.last_support = Some(*support);
        }
        EventPayload::Executed { executor } => {
            update.executor = Some(executor.to_checksum(None));
        }
        EventPayload::Finalized { finalizer } => {
            update.finalizer = Some(finalizer.to_checksum(None));
        }
    }

    update
}
