//! Background reclamation of stale quota state.
//!
//! Per-request pruning keeps admission decisions correct; this task only
//! bounds memory. It runs on a fixed interval, tolerates skipped or late
//! ticks, and stops promptly when its [`CancellationToken`] fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use quotaguard_core::ports::Clock;

use super::QuotaState;
use crate::{env_var, setting_or};

/// Configuration for the reclamation sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Interval between passes (default: 5 minutes).
    pub interval: Duration,
    /// Counter timestamps older than this are dropped (default: 10 minutes).
    pub retention: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            retention: Duration::from_secs(600),
        }
    }
}

impl SweeperConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Read `QUOTA_SWEEP_INTERVAL_SECS` and `QUOTA_SWEEP_RETENTION_SECS`
    /// through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            interval: Duration::from_secs(setting_or(
                &lookup,
                "QUOTA_SWEEP_INTERVAL_SECS",
                defaults.interval.as_secs(),
            )),
            retention: Duration::from_secs(setting_or(
                &lookup,
                "QUOTA_SWEEP_RETENTION_SECS",
                defaults.retention.as_secs(),
            )),
        }
    }

    /// Raise retention to at least `longest_window`, so the sweeper never
    /// drops a timestamp a live window still counts.
    pub fn covering(mut self, longest_window: Duration) -> Self {
        self.retention = self.retention.max(longest_window);
        self
    }
}

/// Handle to a running sweeper.
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Token that stops the sweeper when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the sweeper and wait for its loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Quota sweeper task failed");
        }
    }
}

/// Periodic pruner for [`QuotaState`].
pub struct ReclamationSweeper {
    state: Arc<QuotaState>,
    clock: Arc<dyn Clock>,
    config: SweeperConfig,
}

impl ReclamationSweeper {
    pub fn new(state: Arc<QuotaState>, clock: Arc<dyn Clock>, config: SweeperConfig) -> Self {
        Self {
            state,
            clock,
            config,
        }
    }

    /// Start the sweeper on the current Tokio runtime.
    pub fn spawn(self) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));

        SweeperHandle { cancel, task }
    }

    async fn run(self, cancel: CancellationToken) {
        let period = self.config.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = period.as_secs(),
            retention_secs = self.config.retention.as_secs(),
            "Quota sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Quota sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => self.sweep_once(),
            }
        }
    }

    fn sweep_once(&self) {
        let report = self.state.sweep(self.clock.now(), self.config.retention);

        if !report.is_empty() {
            debug!(
                timestamps_pruned = report.timestamps_pruned,
                counter_keys_removed = report.counter_keys_removed,
                violation_records_removed = report.violation_records_removed,
                blocks_removed = report.blocks_removed,
                "Quota sweep completed"
            );
        }
    }
}
