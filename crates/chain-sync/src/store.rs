//! In-memory proposal table with merge-upsert semantics

use crate::types::ProposalId;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

/// Mirrored state of one governance proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRecord {
    pub id: ProposalId,
    pub description: String,
    pub creator: Option<String>,
    pub executed: bool,
    pub executor: Option<String>,
    pub finalized: bool,
    pub finalizer: Option<String>,
    /// Decimal string, replaced wholesale from canonical snapshots.
    pub votes_for: String,
    /// Decimal string, replaced wholesale from canonical snapshots.
    pub votes_against: String,
    pub last_voter: Option<String>,
    pub last_support: Option<bool>,
    /// Epoch milliseconds. Set on insert and never overwritten.
    pub created_at: u64,
}

/// Partial record applied by [`ProposalStore::upsert`].
///
/// `None` leaves the stored field untouched. The boolean flags may only be
/// supplied as `Some(true)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalUpdate {
    pub id: ProposalId,
    pub description: Option<String>,
    pub creator: Option<String>,
    pub executed: Option<bool>,
    pub executor: Option<String>,
    pub finalized: Option<bool>,
    pub finalizer: Option<String>,
    pub votes_for: Option<String>,
    pub votes_against: Option<String>,
    pub last_voter: Option<String>,
    pub last_support: Option<bool>,
    pub created_at: Option<u64>,
}

impl ProposalUpdate {
    pub fn new(id: ProposalId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// Keyed proposal table. Only the sync pipeline writes to it.
#[derive(Default)]
pub struct ProposalStore {
    records: RwLock<HashMap<ProposalId, ProposalRecord>>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record or merge `update` over the existing one.
    ///
    /// Merge rules: `created_at` keeps the first value ever stored; the
    /// `executed`/`finalized` flags never go from true back to false; every
    /// other supplied field replaces the stored one. Returns the stored record.
    pub fn upsert(&self, update: ProposalUpdate) -> ProposalRecord {
        let mut records = self.records.write();

        match records.get_mut(&update.id) {
            None => {
                let record = ProposalRecord {
                    id: update.id,
                    description: update.description.unwrap_or_default(),
                    creator: update.creator,
                    executed: update.executed.unwrap_or(false),
                    executor: update.executor,
                    finalized: update.finalized.unwrap_or(false),
                    finalizer: update.finalizer,
                    votes_for: update.votes_for.unwrap_or_else(|| "0".to_string()),
                    votes_against: update.votes_against.unwrap_or_else(|| "0".to_string()),
                    last_voter: update.last_voter,
                    last_support: update.last_support,
                    created_at: update
                        .created_at
                        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().max(0) as u64),
                };
                records.insert(record.id, record.clone());
                record
            }
            Some(existing) => {
                debug_assert!(
                    !(existing.executed && update.executed == Some(false)),
                    "executed flag must not be reverted for proposal {}",
                    update.id
                );
                debug_assert!(
                    !(existing.finalized && update.finalized == Some(false)),
                    "finalized flag must not be reverted for proposal {}",
                    update.id
                );

                if let Some(description) = update.description {
                    existing.description = description;
                }
                if let Some(creator) = update.creator {
                    existing.creator = Some(creator);
                }
                existing.executed |= update.executed.unwrap_or(false);
                if let Some(executor) = update.executor {
                    existing.executor = Some(executor);
                }
                existing.finalized |= update.finalized.unwrap_or(false);
                if let Some(finalizer) = update.finalizer {
                    existing.finalizer = Some(finalizer);
                }
                if let Some(votes_for) = update.votes_for {
                    existing.votes_for = votes_for;
                }
                if let Some(votes_against) = update.votes_against {
                    existing.votes_against = votes_against;
                }
                if let Some(voter) = update.last_voter {
                    existing.last_voter = Some(voter);
                }
                if let Some(support) = update.last_support {
                    existing.last_support = Some(support);
                }
                existing.clone()
            }
        }
    }

    /// Copy of every record, sorted by id.
    pub fn get_all(&self) -> Vec<ProposalRecord> {
        let mut all: Vec<_> = self.records.read().values().cloned().collect();
        all.sort_by_key(|r| r.id);
        all
    }

    pub fn get_by_id(&self, id: ProposalId) -> Option<ProposalRecord> {
        self.records.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_update(id: ProposalId) -> ProposalUpdate {
        ProposalUpdate {
            id,
            description: Some("Fund community research".to_string()),
            executed: None,
            finalized: None,
            votes_for: Some("10".to_string()),
            votes_against: Some("3".to_string()),
            created_at: Some(1_700_000_000_000),
            ..ProposalUpdate::new(id)
        }
    }

    #[test]
    fn test_insert_applies_defaults() {
        let store = ProposalStore::new();
        let record = store.upsert(ProposalUpdate::new(4));

        assert_eq!(record.id, 4);
        assert_eq!(record.description, "");
        assert_eq!(record.creator, None);
        assert!(!record.executed);
        assert!(!record.finalized);
        assert_eq!(record.votes_for, "0");
        assert_eq!(record.votes_against, "0");
        assert_eq!(record.last_support, None);
        assert!(record.created_at > 0);
    }

    #[test]
    fn test_repeat_application_is_idempotent() {
        let store = ProposalStore::new();
        let first = store.upsert(snapshot_update(7));
        let second = store.upsert(snapshot_update(7));

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_created_at_is_immutable() {
        let store = ProposalStore::new();
        store.upsert(snapshot_update(1));

        let mut later = snapshot_update(1);
        later.created_at = Some(1_800_000_000_000);
        let record = store.upsert(later);

        assert_eq!(record.created_at, 1_700_000_000_000);
    }

    #[test]
    fn test_flags_are_monotonic() {
        let store = ProposalStore::new();
        store.upsert(ProposalUpdate {
            executed: Some(true),
            finalized: Some(true),
            ..ProposalUpdate::new(2)
        });

        // Updates that leave the flags unset must not clear them.
        for _ in 0..3 {
            let record = store.upsert(snapshot_update(2));
            assert!(record.executed);
            assert!(record.finalized);
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_false_flag_does_not_revert_in_release() {
        let store = ProposalStore::new();
        store.upsert(ProposalUpdate {
            executed: Some(true),
            ..ProposalUpdate::new(3)
        });
        let record = store.upsert(ProposalUpdate {
            executed: Some(false),
            ..ProposalUpdate::new(3)
        });
        assert!(record.executed);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "executed flag must not be reverted")]
    fn test_false_flag_trips_assertion() {
        let store = ProposalStore::new();
        store.upsert(ProposalUpdate {
            executed: Some(true),
            ..ProposalUpdate::new(3)
        });
        store.upsert(ProposalUpdate {
            executed: Some(false),
            ..ProposalUpdate::new(3)
        });
    }

    #[test]
    fn test_votes_are_replaced_not_summed() {
        let store = ProposalStore::new();
        store.upsert(snapshot_update(9));

        let record = store.upsert(ProposalUpdate {
            votes_for: Some("150000000000000000000".to_string()),
            ..ProposalUpdate::new(9)
        });

        assert_eq!(record.votes_for, "150000000000000000000");
        assert_eq!(record.votes_against, "3");
    }

    #[test]
    fn test_merge_keeps_unsupplied_fields() {
        let store = ProposalStore::new();
        store.upsert(ProposalUpdate {
            creator: Some("0x1111111111111111111111111111111111111111".to_string()),
            ..snapshot_update(5)
        });

        let record = store.upsert(ProposalUpdate {
            last_voter: Some("0x2222222222222222222222222222222222222222".to_string()),
            last_support: Some(false),
            ..ProposalUpdate::new(5)
        });

        assert_eq!(
            record.creator.as_deref(),
            Some("0x1111111111111111111111111111111111111111")
        );
        assert_eq!(record.description, "Fund community research");
        assert_eq!(record.last_support, Some(false));
    }

    #[test]
    fn test_get_all_returns_copies() {
        let store = ProposalStore::new();
        store.upsert(ProposalUpdate::new(2));
        store.upsert(ProposalUpdate::new(1));

        let mut all = store.get_all();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);

        all[0].description = "tampered".to_string();
        assert_eq!(store.get_by_id(1).unwrap().description, "");
    }

    #[test]
    fn test_get_by_id_missing() {
        let store = ProposalStore::new();
        assert!(store.get_by_id(42).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let store = ProposalStore::new();
        let record = store.upsert(snapshot_update(1));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["votesFor"], "10");
        assert_eq!(json["createdAt"], 1_700_000_000_000u64);
        assert!(json["lastVoter"].is_null());
    }
}
