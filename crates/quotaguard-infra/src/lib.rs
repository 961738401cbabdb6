//! # Quotaguard Infrastructure
//!
//! Concrete implementations of the ports defined in `quotaguard-core`:
//! the in-memory quota engine and bearer token validation.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - Quota enforcement only
//! - `auth` - JWT bearer tokens for resolving user identity and privilege

pub mod quota;

#[cfg(feature = "auth")]
pub mod auth;

pub use quota::{
    AdmissionController, EscalationPolicy, QuotaState, QuotaStats, ReclamationSweeper,
    SweeperConfig, SweeperHandle,
};

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};

/// Parse the setting `key` from `lookup`, falling back to `default` when it
/// is absent or malformed.
pub(crate) fn setting_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Lookup over the process environment, for use with [`setting_or`].
pub(crate) fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
