//! Multi-kind event fetch and fixed-order dispatch

use crate::error::SyncResult;
use crate::reconciler::SnapshotReconciler;
use crate::source::EventSource;
use crate::types::{BlockPosition, ChainEvent, EventKind};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// Events for one block range, grouped by kind in processing order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventBatch {
    groups: Vec<(EventKind, Vec<ChainEvent>)>,
}

impl EventBatch {
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, events)| events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.groups
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, events)| events.len())
    }

    /// Events flattened in dispatch order: every created event, then every
    /// vote, then executions, then finalizations. Within a kind the source's
    /// order is kept as-is.
    pub fn iter(&self) -> impl Iterator<Item = &ChainEvent> {
        self.groups.iter().flat_map(|(_, events)| events.iter())
    }
}

pub struct EventDemultiplexer {
    source: Arc<dyn EventSource>,
}

impl EventDemultiplexer {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self { source }
    }

    /// Fetch every recognized kind in `[from, to]` concurrently. Kinds the
    /// source does not support yield an empty group.
    pub async fn fetch(&self, from: BlockPosition, to: BlockPosition) -> SyncResult<EventBatch> {
        let fetches = EventKind::PROCESSING_ORDER
            .iter()
            .map(|&kind| fetch_kind(self.source.as_ref(), kind, from, to));

        // try_join_all preserves input order, so groups come back in
        // PROCESSING_ORDER regardless of completion order.
        let groups = try_join_all(fetches).await?;
        Ok(EventBatch { groups })
    }

    /// Apply every event in dispatch order, stopping at the first failure.
    pub async fn dispatch(
        &self,
        batch: &EventBatch,
        reconciler: &SnapshotReconciler,
    ) -> SyncResult<usize> {
        let mut applied = 0;
        for event in batch.iter() {
            reconciler.apply(event).await?;
            applied += 1;
        }
        Ok(applied)
    }
}

async fn fetch_kind(
    source: &dyn EventSource,
    kind: EventKind,
    from: BlockPosition,
    to: BlockPosition,
) -> SyncResult<(EventKind, Vec<ChainEvent>)> {
    if !source.supports(kind) {
        debug!(kind = %kind, "Event kind not supported by source, skipping");
        return Ok((kind, Vec::new()));
    }
    let events = source.query_events(kind, from, to).await?;
    Ok((kind, events))
}
