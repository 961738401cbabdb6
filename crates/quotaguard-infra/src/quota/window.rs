//! Sliding-window request counters.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use quotaguard_core::{ClientIdentity, PolicyTier};

/// Counter identity. Tiers with different windows never share a counter,
/// even under the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub client: ClientIdentity,
    pub tier: String,
    pub window: Duration,
}

impl CounterKey {
    pub fn new(client: &ClientIdentity, policy: &PolicyTier) -> Self {
        Self {
            client: client.clone(),
            tier: policy.name().to_string(),
            window: policy.window(),
        }
    }
}

/// Result of one check-and-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCheck {
    pub allowed: bool,
    pub remaining: u32,
    /// When the oldest counted request ages out of the window.
    pub reset_at: DateTime<Utc>,
}

/// Per-key ordered request timestamps.
///
/// Each record is mutated only while its map shard is write-locked, so
/// concurrent checks for one key are serialized and never lose a count.
#[derive(Debug, Default)]
pub struct SlidingWindowCounterStore {
    records: DashMap<CounterKey, VecDeque<DateTime<Utc>>>,
}

impl SlidingWindowCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prune expired timestamps, then admit and record the request if the
    /// window has room. Denied attempts are not recorded.
    pub fn record_and_check(
        &self,
        client: &ClientIdentity,
        policy: &PolicyTier,
        now: DateTime<Utc>,
    ) -> WindowCheck {
        let window = policy.window_delta();
        let cutoff = now - window;
        let mut record = self.records.entry(CounterKey::new(client, policy)).or_default();

        prune(&mut record, cutoff);

        let count = record.len();
        let limit = policy.max_requests() as usize;

        if count >= limit {
            let oldest = record.front().copied().unwrap_or(now);
            return WindowCheck {
                allowed: false,
                remaining: 0,
                reset_at: oldest + window,
            };
        }

        insert_ordered(&mut record, now);
        let oldest = record.front().copied().unwrap_or(now);

        WindowCheck {
            allowed: true,
            remaining: (limit - record.len()) as u32,
            reset_at: oldest + window,
        }
    }

    /// Requests currently counted for `client` under `policy`.
    pub fn count(&self, client: &ClientIdentity, policy: &PolicyTier, now: DateTime<Utc>) -> usize {
        let cutoff = now - policy.window_delta();
        self.records
            .get(&CounterKey::new(client, policy))
            .map(|record| record.iter().filter(|t| **t > cutoff).count())
            .unwrap_or(0)
    }

    /// Drop timestamps at or before `cutoff` and delete keys left empty.
    /// Returns `(timestamps_pruned, keys_removed)`.
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> (usize, usize) {
        let mut pruned = 0;
        let before = self.records.len();

        self.records.retain(|_, record| {
            pruned += prune(record, cutoff);
            !record.is_empty()
        });

        (pruned, before.saturating_sub(self.records.len()))
    }

    /// Number of tracked counter keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Insert `at` keeping the record sorted. Callers read the clock before
/// taking the entry lock, so a racing request may arrive with an earlier
/// timestamp than the last one stored.
pub(crate) fn insert_ordered(record: &mut VecDeque<DateTime<Utc>>, at: DateTime<Utc>) {
    let position = record.partition_point(|t| *t <= at);
    record.insert(position, at);
}

/// Records are kept sorted, so expired timestamps are always at the front.
pub(crate) fn prune(record: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) -> usize {
    let mut pruned = 0;
    while record.front().is_some_and(|t| *t <= cutoff) {
        record.pop_front();
        pruned += 1;
    }
    pruned
}
