//! Block range bookkeeping

use crate::types::BlockPosition;

/// What a cycle should do for a given tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPlan {
    /// Scan the inclusive range.
    Scan {
        from: BlockPosition,
        to: BlockPosition,
    },
    /// Tip has not moved past the cursor; nothing new to fetch.
    Idle { tip: BlockPosition },
}

/// Last processed position in the upstream log.
///
/// `None` means "start from whatever the tip is on the first cycle", which
/// skips historical backlog. The position never decreases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockRangeCursor {
    last_processed: Option<BlockPosition>,
}

impl BlockRangeCursor {
    pub fn new(start: Option<BlockPosition>) -> Self {
        Self {
            last_processed: start,
        }
    }

    pub fn position(&self) -> Option<BlockPosition> {
        self.last_processed
    }

    /// Compute the range for a cycle that observed `tip`.
    pub fn plan(&self, tip: BlockPosition) -> ScanPlan {
        let from = self.last_processed.unwrap_or(tip);
        if from > tip {
            ScanPlan::Idle { tip }
        } else {
            ScanPlan::Scan { from, to: tip }
        }
    }

    /// Record an idle cycle. An unset cursor is pinned to the tip; a cursor
    /// already ahead of a regressed tip stays where it is.
    pub fn settle_idle(&mut self, tip: BlockPosition) {
        self.last_processed = Some(self.last_processed.map_or(tip, |p| p.max(tip)));
    }

    /// Record that every event up to and including `to` has been applied.
    pub fn advance_past(&mut self, to: BlockPosition) {
        let next = to.saturating_add(1);
        self.last_processed = Some(self.last_processed.map_or(next, |p| p.max(next)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_cursor_starts_at_tip() {
        let cursor = BlockRangeCursor::new(None);
        assert_eq!(cursor.plan(100), ScanPlan::Scan { from: 100, to: 100 });
    }

    #[test]
    fn test_configured_start_is_used() {
        let cursor = BlockRangeCursor::new(Some(40));
        assert_eq!(cursor.plan(100), ScanPlan::Scan { from: 40, to: 100 });
    }

    #[test]
    fn test_advance_moves_past_range() {
        let mut cursor = BlockRangeCursor::new(None);
        cursor.advance_past(100);
        assert_eq!(cursor.position(), Some(101));
        assert_eq!(cursor.plan(100), ScanPlan::Idle { tip: 100 });
        assert_eq!(cursor.plan(105), ScanPlan::Scan { from: 101, to: 105 });
    }

    #[test]
    fn test_idle_pins_unset_cursor() {
        let mut cursor = BlockRangeCursor::default();
        cursor.settle_idle(55);
        assert_eq!(cursor.position(), Some(55));
    }

    #[test]
    fn test_never_regresses() {
        let mut cursor = BlockRangeCursor::new(Some(200));
        let mut seen = vec![cursor.position().unwrap()];

        for tip in [150, 210, 180, 220, 90] {
            match cursor.plan(tip) {
                ScanPlan::Scan { to, .. } => cursor.advance_past(to),
                ScanPlan::Idle { tip } => cursor.settle_idle(tip),
            }
            seen.push(cursor.position().unwrap());
        }

        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert_eq!(cursor.position(), Some(221));
    }

    #[test]
    fn test_advance_saturates() {
        let mut cursor = BlockRangeCursor::default();
        cursor.advance_past(u64::MAX);
        assert_eq!(cursor.position(), Some(u64::MAX));
    }
}
