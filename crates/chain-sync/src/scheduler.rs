//! Periodic driver for the sync engine

use crate::engine::{CycleOutcome, SyncEngine};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10_000);

/// Fires a poll cycle immediately on start and then every `poll_interval`.
///
/// Each tick spawns its own cycle, so a cycle that outlives the interval
/// causes the following ticks to be skipped by the engine's guard rather
/// than queued.
pub struct PollScheduler {
    engine: Arc<SyncEngine>,
    poll_interval: Duration,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new(engine: Arc<SyncEngine>, poll_interval: Duration) -> Self {
        let poll_interval = if poll_interval.is_zero() {
            warn!("Poll interval of zero is not allowed, using default");
            DEFAULT_POLL_INTERVAL
        } else {
            poll_interval
        };

        Self {
            engine,
            poll_interval,
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Start the repeating task. Must be called from within a Tokio runtime.
    ///
    /// Returns `false` without doing anything if already started.
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("Poll scheduler already started");
            return false;
        }

        let engine = self.engine.clone();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                // The first tick completes immediately.
                ticker.tick().await;

                let engine = engine.clone();
                tokio::spawn(async move {
                    if let CycleOutcome::Failed { error } = engine.run_cycle().await {
                        debug!(error = %error, "Retrying on next tick");
                    }
                });
            }
        });

        *self.task.lock() = Some(handle);
        info!(
            interval_ms = poll_interval.as_millis() as u64,
            "Contract polling initialized"
        );
        true
    }

    /// Stop scheduling new cycles. A cycle already running completes.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            info!("Contract polling stopped");
        }
        self.started.store(false, Ordering::Release);
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
