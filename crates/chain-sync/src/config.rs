//! Poller configuration

use crate::engine::DEFAULT_CYCLE_TIMEOUT;
use crate::error::{SyncError, SyncResult};
use crate::scheduler::DEFAULT_POLL_INTERVAL;
use crate::types::{BlockPosition, EventKind};
use alloy_primitives::Address;
use std::time::Duration;

/// Everything needed to run the contract poller.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub rpc_url: String,
    pub contract_address: Address,
    /// Initial cursor. `None` starts at the tip on the first cycle.
    pub start_position: Option<BlockPosition>,
    pub poll_interval: Duration,
    /// Deadline for one whole cycle, so a stalled upstream cannot hold the
    /// reentrancy guard forever.
    pub cycle_timeout: Duration,
    pub event_kinds: Vec<EventKind>,
}

impl SyncConfig {
    /// Build from optional raw settings.
    ///
    /// Returns [`SyncError::ConfigMissing`] when the RPC URL or contract
    /// address is absent or blank; callers treat that as "polling disabled".
    pub fn from_settings(
        rpc_url: Option<&str>,
        contract_address: Option<&str>,
    ) -> SyncResult<Self> {
        let rpc_url = rpc_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SyncError::ConfigMissing("RPC_URL"))?;
        let contract = contract_address
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SyncError::ConfigMissing("CONTRACT_ADDRESS"))?;
        let contract_address: Address = contract
            .parse()
            .map_err(|_| SyncError::ConfigMissing("CONTRACT_ADDRESS (not a valid address)"))?;

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            contract_address,
            start_position: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            event_kinds: EventKind::PROCESSING_ORDER.to_vec(),
        })
    }

    pub fn with_start_position(mut self, start: Option<BlockPosition>) -> Self {
        self.start_position = start;
        self
    }

    /// Zero keeps the default.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.poll_interval = interval;
        }
        self
    }

    /// Zero keeps the default.
    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.cycle_timeout = timeout;
        }
        self
    }

    pub fn with_event_kinds(mut self, kinds: Vec<EventKind>) -> Self {
        if !kinds.is_empty() {
            self.event_kinds = kinds;
        }
        self
    }
}

/// Parse a comma separated list such as `created,voted`.
pub fn parse_event_kinds(raw: &str) -> Result<Vec<EventKind>, String> {
    let mut kinds = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let kind: EventKind = part.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}
