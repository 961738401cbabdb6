//! In-memory quota enforcement.
//!
//! [`QuotaState`] owns the three shared stores (sliding-window counters,
//! violation history, block list). [`AdmissionController`] composes them into
//! a single decision, and [`ReclamationSweeper`] bounds their memory in the
//! background. All state is per-process and lost on restart.

mod admission;
mod blocklist;
mod state;
mod sweeper;
mod violations;
mod window;

pub use admission::{AdmissionController, EscalationPolicy};
pub use blocklist::BlockList;
pub use state::{QuotaState, QuotaStats, SweepReport};
pub use sweeper::{ReclamationSweeper, SweeperConfig, SweeperHandle};
pub use violations::ViolationTracker;
pub use window::{CounterKey, SlidingWindowCounterStore, WindowCheck};

use chrono::{DateTime, Utc};

/// Whole seconds from `now` until `until`, rounded up and at least one.
pub(crate) fn secs_until(now: DateTime<Utc>, until: DateTime<Utc>) -> u64 {
    let millis = (until - now).num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}
