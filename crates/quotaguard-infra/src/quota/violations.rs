//! Per-client quota violation history.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

use quotaguard_core::ClientIdentity;

use super::window::{insert_ordered, prune};

/// Counts quota-exceeded events per client over a trailing window
/// (one hour by default). Scoped per client, not per tier. Pure counting;
/// blocking decisions live in the admission controller.
#[derive(Debug)]
pub struct ViolationTracker {
    records: DashMap<ClientIdentity, VecDeque<DateTime<Utc>>>,
    window: TimeDelta,
}

impl Default for ViolationTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl ViolationTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            records: DashMap::new(),
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::hours(1)),
        }
    }

    /// Record a violation and return how many fall within the trailing window.
    pub fn record_violation(&self, client: &ClientIdentity, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let mut record = self.records.entry(client.clone()).or_default();

        insert_ordered(&mut record, now);
        prune(&mut record, cutoff);

        record.len()
    }

    pub fn count(&self, client: &ClientIdentity, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        self.records
            .get(client)
            .map(|record| record.iter().filter(|t| **t > cutoff).count())
            .unwrap_or(0)
    }

    /// Forget a client's history.
    pub fn clear(&self, client: &ClientIdentity) -> bool {
        self.records.remove(client).is_some()
    }

    /// Prune aged-out violations and delete clients left with none.
    /// Returns the number of clients removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let before = self.records.len();

        self.records.retain(|_, record| {
            record.retain(|t| *t > cutoff);
            !record.is_empty()
        });

        before.saturating_sub(self.records.len())
    }

    /// Number of clients with tracked violations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
