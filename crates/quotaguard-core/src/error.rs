//! Domain-level error types.

use thiserror::Error;

/// Denial signals raised by admission control.
///
/// Both variants map to HTTP 429 and always carry an exact retry delay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds.")]
    QuotaExceeded { retry_after_secs: u64 },

    #[error(
        "Too many rate limit violations. Access is blocked; try again in {retry_after_secs} seconds."
    )]
    ClientBlocked { retry_after_secs: u64 },
}

impl QuotaError {
    /// Seconds the client must wait before retrying.
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            QuotaError::QuotaExceeded { retry_after_secs }
            | QuotaError::ClientBlocked { retry_after_secs } => *retry_after_secs,
        }
    }

    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        429
    }
}

/// Policy configuration errors, raised only while building the policy table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid tier '{name}': {reason}")]
    InvalidTier { name: String, reason: String },

    #[error("Policy table has no '{0}' tier")]
    MissingDefaultTier(&'static str),
}
