//! Application state

use chain_sync::{PollScheduler, ProposalStore, SyncStatus};
use std::sync::Arc;
use wallet_auth::ChallengeAuth;

pub struct AppState {
    /// Mirrored proposals, written only by the poller
    pub proposals: Arc<ProposalStore>,
    pub auth: Arc<ChallengeAuth>,
    /// Absent when RPC configuration is missing
    pub poller: Option<Arc<PollScheduler>>,
}

impl AppState {
    pub fn new(proposals: Arc<ProposalStore>, auth: Arc<ChallengeAuth>) -> Self {
        Self {
            proposals,
            auth,
            poller: None,
        }
    }

    pub fn with_poller(mut self, poller: Arc<PollScheduler>) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn sync_status(&self) -> Option<SyncStatus> {
        self.poller.as_ref().map(|p| p.engine().status())
    }
}
