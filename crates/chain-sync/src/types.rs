//! Event and snapshot types shared by the sync pipeline

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// On-chain proposal identifier.
pub type ProposalId = u64;

/// Ordered position in the upstream log (a block number).
pub type BlockPosition = u64;

/// Recognized contract event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Voted,
    Executed,
    Finalized,
}

impl EventKind {
    /// Processing order within a cycle. All events of one kind are applied
    /// before any event of the next kind, regardless of block position.
    pub const PROCESSING_ORDER: [EventKind; 4] = [
        EventKind::Created,
        EventKind::Voted,
        EventKind::Executed,
        EventKind::Finalized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Voted => "voted",
            EventKind::Executed => "executed",
            EventKind::Finalized => "finalized",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" | "proposalcreated" => Ok(EventKind::Created),
            "voted" | "vote" => Ok(EventKind::Voted),
            "executed" | "proposalexecuted" => Ok(EventKind::Executed),
            "finalized" | "proposalfinalized" => Ok(EventKind::Finalized),
            other => Err(format!("unknown event kind: {other}")),
        }
    }
}

/// Kind-specific event fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Created { creator: Address, description: String },
    Voted { voter: Address, support: bool, weight: U256 },
    Executed { executor: Address },
    Finalized { finalizer: Address },
}

/// A single decoded contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEvent {
    pub proposal_id: ProposalId,
    pub position: BlockPosition,
    pub payload: EventPayload,
}

impl ChainEvent {
    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::Created { .. } => EventKind::Created,
            EventPayload::Voted { .. } => EventKind::Voted,
            EventPayload::Executed { .. } => EventKind::Executed,
            EventPayload::Finalized { .. } => EventKind::Finalized,
        }
    }
}

/// Canonical proposal state as reported by the contract itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalSnapshot {
    pub id: ProposalId,
    pub description: String,
    pub executed: bool,
    pub finalized: bool,
    pub votes_for: U256,
    pub votes_against: U256,
    /// Epoch milliseconds.
    pub created_at: u64,
}
