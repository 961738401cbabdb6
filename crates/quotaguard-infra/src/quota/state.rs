//! Shared quota state.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use super::{BlockList, SlidingWindowCounterStore, ViolationTracker};

/// The stores behind admission control, constructed explicitly and shared
/// (via `Arc`) between the controller and the sweeper.
#[derive(Debug, Default)]
pub struct QuotaState {
    pub counters: SlidingWindowCounterStore,
    pub violations: ViolationTracker,
    pub blocks: BlockList,
}

/// Store sizes at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaStats {
    pub counter_keys: usize,
    pub clients_with_violations: usize,
    pub active_blocks: usize,
}

/// What one reclamation pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub timestamps_pruned: usize,
    pub counter_keys_removed: usize,
    pub violation_records_removed: usize,
    pub blocks_removed: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl QuotaState {
    /// Fresh state tracking violations over `violation_window`.
    pub fn new(violation_window: Duration) -> Self {
        Self {
            counters: SlidingWindowCounterStore::new(),
            violations: ViolationTracker::new(violation_window),
            blocks: BlockList::new(),
        }
    }

    pub fn stats(&self, now: DateTime<Utc>) -> QuotaStats {
        QuotaStats {
            counter_keys: self.counters.len(),
            clients_with_violations: self.violations.len(),
            active_blocks: self.blocks.active_count(now),
        }
    }

    /// One reclamation pass. Counter timestamps older than `retention` are
    /// dropped, so `retention` must cover the longest configured window.
    pub fn sweep(&self, now: DateTime<Utc>, retention: Duration) -> SweepReport {
        let retention = TimeDelta::from_std(retention).unwrap_or(TimeDelta::days(1));
        let (timestamps_pruned, counter_keys_removed) =
            self.counters.prune_older_than(now - retention);

        SweepReport {
            timestamps_pruned,
            counter_keys_removed,
            violation_records_removed: self.violations.sweep(now),
            blocks_removed: self.blocks.sweep(now),
        }
    }
}
