//! One poll cycle: tip → range → fetch → reconcile → advance

use crate::cursor::{BlockRangeCursor, ScanPlan};
use crate::demux::EventDemultiplexer;
use crate::error::{SyncError, SyncResult};
use crate::reconciler::SnapshotReconciler;
use crate::source::EventSource;
use crate::store::ProposalStore;
use crate::types::BlockPosition;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of a single [`SyncEngine::run_cycle`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle held the guard; nothing was done.
    Skipped,
    /// Tip did not advance past the cursor.
    Idle { tip: BlockPosition },
    /// Range fully applied and the cursor advanced past `to`.
    Synced {
        from: BlockPosition,
        to: BlockPosition,
        applied: usize,
    },
    /// Cycle aborted; the cursor was left untouched.
    Failed { error: String },
}

/// Point-in-time view of the poller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub last_processed_position: Option<BlockPosition>,
    pub in_progress: bool,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub cycles_skipped: u64,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Owns the cursor and the reentrancy guard, and drives one cycle at a time.
pub struct SyncEngine {
    source: Arc<dyn EventSource>,
    demux: EventDemultiplexer,
    reconciler: SnapshotReconciler,
    cursor: Mutex<BlockRangeCursor>,
    in_progress: AtomicBool,
    cycle_timeout: Duration,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    cycles_skipped: AtomicU64,
    last_synced_at: RwLock<Option<DateTime<Utc>>>,
}

/// Releases the in-progress flag on every exit path, including panics and
/// cancellation of the cycle future.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn EventSource>,
        store: Arc<ProposalStore>,
        start_position: Option<BlockPosition>,
    ) -> Self {
        Self {
            demux: EventDemultiplexer::new(source.clone()),
            reconciler: SnapshotReconciler::new(source.clone(), store),
            source,
            cursor: Mutex::new(BlockRangeCursor::new(start_position)),
            in_progress: AtomicBool::new(false),
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            cycles_skipped: AtomicU64::new(0),
            last_synced_at: RwLock::new(None),
        }
    }

    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_timeout = timeout;
        self
    }

    pub fn cursor_position(&self) -> Option<BlockPosition> {
        self.cursor.lock().position()
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Run one cycle unless one is already running. Never returns an error:
    /// failures are logged and reported as [`CycleOutcome::Failed`].
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(_guard) = CycleGuard::acquire(&self.in_progress) else {
            self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
            debug!("Poll cycle already in progress, skipping");
            return CycleOutcome::Skipped;
        };

        debug!(cursor = ?self.cursor_position(), "Started poll cycle");

        let result = match tokio::time::timeout(self.cycle_timeout, self.sync_once()).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::CycleTimeout(self.cycle_timeout)),
        };

        match result {
            Ok(outcome) => {
                self.cycles_completed.fetch_add(1, Ordering::Relaxed);
                *self.last_synced_at.write() = Some(Utc::now());
                outcome
            }
            Err(e) => {
                self.cycles_failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    error = %e,
                    cursor = ?self.cursor_position(),
                    "Poll cycle failed, cursor not advanced"
                );
                CycleOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn sync_once(&self) -> SyncResult<CycleOutcome> {
        let tip = self.source.current_position().await?;
        let plan = self.cursor.lock().plan(tip);

        let (from, to) = match plan {
            ScanPlan::Idle { tip } => {
                self.cursor.lock().settle_idle(tip);
                debug!(tip, "No new blocks");
                return Ok(CycleOutcome::Idle { tip });
            }
            ScanPlan::Scan { from, to } => (from, to),
        };

        let batch = self.demux.fetch(from, to).await?;
        let applied = self.demux.dispatch(&batch, &self.reconciler).await?;

        self.cursor.lock().advance_past(to);

        if applied > 0 {
            info!(from_block = from, to_block = to, applied, "Synced block range");
        } else {
            debug!(from_block = from, to_block = to, "Synced block range, no events");
        }

        Ok(CycleOutcome::Synced { from, to, applied })
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            last_processed_position: self.cursor_position(),
            in_progress: self.is_in_progress(),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            last_synced_at: *self.last_synced_at.read(),
        }
    }
}
