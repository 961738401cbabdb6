//! Quota policy tiers and the static tier table.

use std::collections::HashMap;
use std::time::Duration;

use chrono::TimeDelta;

use crate::error::ConfigError;

/// Tier applied when a call site names no tier or an unknown one.
pub const DEFAULT_TIER: &str = "default";
/// Richer tier that privileged clients are upgraded to from [`DEFAULT_TIER`].
pub const PRIVILEGED_TIER: &str = "privileged";
pub const HEAVY_OPERATION_TIER: &str = "heavy-operation";
pub const UPLOAD_TIER: &str = "upload";
pub const SENSITIVE_WORKFLOW_TIER: &str = "sensitive-workflow";
pub const BULK_EXPORT_TIER: &str = "bulk-export";

/// Longest window a tier may declare.
pub const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// A named quota: at most `max_requests` within any trailing `window`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTier {
    name: String,
    max_requests: u32,
    window: Duration,
}

impl PolicyTier {
    /// Build a validated tier.
    pub fn new(
        name: impl Into<String>,
        max_requests: u32,
        window: Duration,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let invalid = |reason: &str| ConfigError::InvalidTier {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if max_requests == 0 {
            return Err(invalid("max_requests must be greater than zero"));
        }
        if window.is_zero() {
            return Err(invalid("window must be greater than zero"));
        }
        if window > MAX_WINDOW {
            return Err(invalid("window must not exceed 24 hours"));
        }

        Ok(Self {
            name,
            max_requests,
            window,
        })
    }

    fn seeded(name: &str, max_requests: u32, window_secs: u64) -> Self {
        Self {
            name: name.to_string(),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// The window as a signed delta for timestamp arithmetic.
    pub fn window_delta(&self) -> TimeDelta {
        // Windows are capped at MAX_WINDOW, so the conversion cannot overflow.
        TimeDelta::from_std(self.window).unwrap_or(TimeDelta::zero())
    }
}

/// Outcome of a tier lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyResolution<'a> {
    /// The requested tier exists.
    Configured(&'a PolicyTier),
    /// The requested tier is unknown; the default tier was substituted.
    Fallback(&'a PolicyTier),
}

impl<'a> PolicyResolution<'a> {
    pub fn tier(&self) -> &'a PolicyTier {
        match self {
            PolicyResolution::Configured(tier) | PolicyResolution::Fallback(tier) => tier,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PolicyResolution::Fallback(_))
    }
}

/// Immutable mapping from tier name to quota, loaded once at startup.
///
/// Always holds a [`DEFAULT_TIER`] entry, so resolution never fails.
#[derive(Debug, Clone)]
pub struct QuotaPolicyTable {
    default: PolicyTier,
    tiers: HashMap<String, PolicyTier>,
}

impl QuotaPolicyTable {
    /// Build a table from explicit tiers. Later duplicates replace earlier ones.
    pub fn new(tiers: impl IntoIterator<Item = PolicyTier>) -> Result<Self, ConfigError> {
        let mut default = None;
        let mut named = HashMap::new();

        for tier in tiers {
            if tier.name == DEFAULT_TIER {
                default = Some(tier);
            } else {
                named.insert(tier.name.clone(), tier);
            }
        }

        let default = default.ok_or(ConfigError::MissingDefaultTier(DEFAULT_TIER))?;
        Ok(Self {
            default,
            tiers: named,
        })
    }

    /// The stock tier set.
    ///
    /// | Tier | Limit |
    /// |------|-------|
    /// | default | 60 / 60s |
    /// | heavy-operation | 10 / 60s |
    /// | upload | 20 / 300s |
    /// | privileged | 200 / 60s |
    /// | sensitive-workflow | 5 / 300s |
    /// | bulk-export | 30 / 300s |
    pub fn with_defaults() -> Self {
        let tiers = [
            PolicyTier::seeded(HEAVY_OPERATION_TIER, 10, 60),
            PolicyTier::seeded(UPLOAD_TIER, 20, 300),
            PolicyTier::seeded(PRIVILEGED_TIER, 200, 60),
            PolicyTier::seeded(SENSITIVE_WORKFLOW_TIER, 5, 300),
            PolicyTier::seeded(BULK_EXPORT_TIER, 30, 300),
        ];

        Self {
            default: PolicyTier::seeded(DEFAULT_TIER, 60, 60),
            tiers: tiers.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// Add or replace a tier. Used while assembling configuration only.
    pub fn insert(&mut self, tier: PolicyTier) {
        if tier.name == DEFAULT_TIER {
            self.default = tier;
        } else {
            self.tiers.insert(tier.name.clone(), tier);
        }
    }

    pub fn get(&self, name: &str) -> Option<&PolicyTier> {
        if name == DEFAULT_TIER {
            Some(&self.default)
        } else {
            self.tiers.get(name)
        }
    }

    /// Look up a tier, substituting the default tier for unknown names.
    pub fn resolve(&self, name: &str) -> PolicyResolution<'_> {
        match self.get(name) {
            Some(tier) => PolicyResolution::Configured(tier),
            None => PolicyResolution::Fallback(&self.default),
        }
    }

    pub fn default_tier(&self) -> &PolicyTier {
        &self.default
    }

    /// Longest window across all tiers.
    pub fn longest_window(&self) -> Duration {
        self.iter().map(PolicyTier::window).max().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolicyTier> {
        std::iter::once(&self.default).chain(self.tiers.values())
    }

    /// Number of tiers, including the default. Never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.tiers.len() + 1
    }
}

impl Default for QuotaPolicyTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
