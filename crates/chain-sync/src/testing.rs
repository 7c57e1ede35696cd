//! Scripted in-memory event source for unit tests

use crate::error::{SyncError, SyncResult};
use crate::source::EventSource;
use crate::types::{BlockPosition, ChainEvent, EventKind, ProposalId, ProposalSnapshot};
use alloy_primitives::U256;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn snapshot(
    id: ProposalId,
    description: &str,
    votes_for: u64,
    votes_against: u64,
) -> ProposalSnapshot {
    ProposalSnapshot {
        id,
        description: description.to_string(),
        executed: false,
        finalized: false,
        votes_for: U256::from(votes_for),
        votes_against: U256::from(votes_against),
        created_at: 1_700_000_000_000,
    }
}

#[derive(Default)]
struct Script {
    tip: BlockPosition,
    events: HashMap<EventKind, Vec<ChainEvent>>,
    snapshots: HashMap<ProposalId, ProposalSnapshot>,
    unsupported: HashSet<EventKind>,
    /// Number of snapshot fetches allowed to succeed before every further
    /// fetch fails.
    snapshot_budget: Option<usize>,
    fail_tip: bool,
    tip_delay: Option<Duration>,
}

pub struct ScriptedSource {
    script: Mutex<Script>,
    pub tip_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    pub snapshot_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(tip: BlockPosition) -> Self {
        Self {
            script: Mutex::new(Script {
                tip,
                ..Default::default()
            }),
            tip_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            snapshot_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_tip(&self, tip: BlockPosition) {
        self.script.lock().tip = tip;
    }

    pub fn set_snapshot(&self, snapshot: ProposalSnapshot) {
        self.script.lock().snapshots.insert(snapshot.id, snapshot);
    }

    pub fn push_event(&self, event: ChainEvent) {
        self.script
            .lock()
            .events
            .entry(event.kind())
            .or_default()
            .push(event);
    }

    pub fn mark_unsupported(&self, kind: EventKind) {
        self.script.lock().unsupported.insert(kind);
    }

    pub fn fail_snapshots_after(&self, successes: Option<usize>) {
        self.script.lock().snapshot_budget = successes;
    }

    pub fn fail_tip(&self, fail: bool) {
        self.script.lock().fail_tip = fail;
    }

    pub fn delay_tip(&self, delay: Option<Duration>) {
        self.script.lock().tip_delay = delay;
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn current_position(&self) -> SyncResult<BlockPosition> {
        self.tip_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.script.lock().tip_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let script = self.script.lock();
        if script.fail_tip {
            return Err(SyncError::UpstreamUnavailable("connection refused".into()));
        }
        Ok(script.tip)
    }

    fn supports(&self, kind: EventKind) -> bool {
        !self.script.lock().unsupported.contains(&kind)
    }

    async fn query_events(
        &self,
        kind: EventKind,
        from: BlockPosition,
        to: BlockPosition,
    ) -> SyncResult<Vec<ChainEvent>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock();
        assert!(
            !script.unsupported.contains(&kind),
            "queried unsupported kind {kind}"
        );
        Ok(script
            .events
            .get(&kind)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.position >= from && e.position <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn canonical_snapshot(&self, id: ProposalId) -> SyncResult<ProposalSnapshot> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock();
        if let Some(budget) = script.snapshot_budget.as_mut() {
            if *budget == 0 {
                return Err(SyncError::UpstreamUnavailable("eth_call timed out".into()));
            }
            *budget -= 1;
        }
        script
            .snapshots
            .get(&id)
            .cloned()
            .ok_or_else(|| SyncError::Rpc {
                code: -32000,
                message: format!("execution reverted: unknown proposal {id}"),
            })
    }
}
