//! Temporary per-client blocks.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

use quotaguard_core::ClientIdentity;

use super::secs_until;

/// Client → block expiry.
///
/// A block covers every tier. An entry past its expiry is treated as absent
/// even before it is physically removed.
#[derive(Debug, Default)]
pub struct BlockList {
    entries: DashMap<ClientIdentity, DateTime<Utc>>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds until the client's block lifts, or `None` if not blocked.
    /// Expired entries are removed on the way.
    pub fn is_blocked(&self, client: &ClientIdentity, now: DateTime<Utc>) -> Option<u64> {
        let expires_at = self.entries.get(client).map(|entry| *entry)?;

        if expires_at > now {
            return Some(secs_until(now, expires_at));
        }

        self.entries.remove_if(client, |_, expiry| *expiry <= now);
        None
    }

    /// Block `client` for `duration` from `now`.
    ///
    /// If a block is already active the later expiry wins, so a block is
    /// never shortened. Returns the effective expiry.
    pub fn block(
        &self,
        client: &ClientIdentity,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let requested = now + TimeDelta::from_std(duration).unwrap_or(TimeDelta::hours(1));

        let mut entry = self.entries.entry(client.clone()).or_insert(requested);
        if *entry < requested {
            *entry = requested;
        }
        *entry
    }

    /// Lift a block. Returns whether one was present.
    pub fn unblock(&self, client: &ClientIdentity) -> bool {
        self.entries.remove(client).is_some()
    }

    /// Physically remove expired entries. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expiry| *expiry > now);
        before.saturating_sub(self.entries.len())
    }

    /// Blocks still in force at `now`.
    pub fn active_count(&self, now: DateTime<Utc>) -> usize {
        self.entries.iter().filter(|entry| *entry.value() > now).count()
    }

    /// Stored entries, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_block_and_expiry() {
        let blocks = BlockList::new();
        let client = ClientIdentity::address("198.51.100.7");

        assert_eq!(blocks.is_blocked(&client, t0()), None);

        blocks.block(&client, Duration::from_secs(300), t0());
        assert_eq!(blocks.is_blocked(&client, t0()), Some(300));
        assert_eq!(
            blocks.is_blocked(&client, t0() + TimeDelta::milliseconds(100_500)),
            Some(200)
        );

        // Expired entries read as absent and are removed lazily.
        assert_eq!(blocks.is_blocked(&client, t0() + TimeDelta::seconds(300)), None);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_block_never_shortens() {
        let blocks = BlockList::new();
        let client = ClientIdentity::user("5");

        let first = blocks.block(&client, Duration::from_secs(600), t0());
        let second = blocks.block(&client, Duration::from_secs(300), t0() + TimeDelta::seconds(10));
        assert_eq!(first, second);

        let third = blocks.block(&client, Duration::from_secs(900), t0() + TimeDelta::seconds(10));
        assert_eq!(third, t0() + TimeDelta::seconds(910));
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_unblock_and_sweep() {
        let blocks = BlockList::new();
        let a = ClientIdentity::user("a");
        let b = ClientIdentity::user("b");

        blocks.block(&a, Duration::from_secs(60), t0());
        blocks.block(&b, Duration::from_secs(600), t0());

        assert!(blocks.unblock(&b));
        assert!(!blocks.unblock(&b));
        assert_eq!(blocks.active_count(t0() + TimeDelta::seconds(61)), 0);
        assert_eq!(blocks.sweep(t0() + TimeDelta::seconds(61)), 1);
        assert!(blocks.is_empty());
    }
}
