//! Admission requests and decisions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::identity::{ClientIdentity, RequestOrigin};
use super::policy::DEFAULT_TIER;
use crate::error::QuotaError;

pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET: &str = "X-RateLimit-Reset";
pub const HEADER_WINDOW: &str = "X-RateLimit-Window";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";

/// Input to a single admission check.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub origin: RequestOrigin,
    pub tier: String,
    pub user_id: Option<String>,
    pub privileged: bool,
}

impl AdmissionRequest {
    pub fn new(tier: impl Into<String>) -> Self {
        Self {
            origin: RequestOrigin::default(),
            tier: tier.into(),
            user_id: None,
            privileged: false,
        }
    }

    pub fn with_origin(mut self, origin: RequestOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// The tier to evaluate: privileged clients asking for the default tier
    /// are upgraded to `privileged_tier`.
    pub fn effective_tier<'a>(&'a self, privileged_tier: &'a str) -> &'a str {
        if self.privileged && self.tier == DEFAULT_TIER {
            privileged_tier
        } else {
            &self.tier
        }
    }
}

impl Default for AdmissionRequest {
    fn default() -> Self {
        Self::new(DEFAULT_TIER)
    }
}

/// Quota metadata for one tier after a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaStatus {
    pub tier: String,
    pub limit: u32,
    pub remaining: u32,
    /// When the oldest counted request leaves the window.
    pub reset_at: DateTime<Utc>,
    pub window: Duration,
}

impl QuotaStatus {
    pub fn reset_epoch_secs(&self) -> i64 {
        self.reset_at.timestamp()
    }

    /// `X-RateLimit-*` header pairs for transports that speak HTTP.
    pub fn header_pairs(&self) -> [(&'static str, String); 4] {
        [
            (HEADER_LIMIT, self.limit.to_string()),
            (HEADER_REMAINING, self.remaining.to_string()),
            (HEADER_RESET, self.reset_epoch_secs().to_string()),
            (HEADER_WINDOW, self.window.as_secs().to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The tier's window is full.
    QuotaExceeded,
    /// The client is serving an escalation block.
    ClientBlocked,
}

/// A rejected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub client: ClientIdentity,
    pub reason: DenialReason,
    pub retry_after_secs: u64,
    /// Tier metadata, absent when a block short-circuited the check.
    pub status: Option<QuotaStatus>,
}

impl Denial {
    pub fn to_error(&self) -> QuotaError {
        match self.reason {
            DenialReason::QuotaExceeded => QuotaError::QuotaExceeded {
                retry_after_secs: self.retry_after_secs,
            },
            DenialReason::ClientBlocked => QuotaError::ClientBlocked {
                retry_after_secs: self.retry_after_secs,
            },
        }
    }
}

/// Verdict for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Allowed(QuotaStatus),
    Denied(Denial),
}

impl AdmissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionDecision::Allowed(_))
    }

    pub fn status(&self) -> Option<&QuotaStatus> {
        match self {
            AdmissionDecision::Allowed(status) => Some(status),
            AdmissionDecision::Denied(denial) => denial.status.as_ref(),
        }
    }

    pub fn into_result(self) -> Result<QuotaStatus, QuotaError> {
        match self {
            AdmissionDecision::Allowed(status) => Ok(status),
            AdmissionDecision::Denied(denial) => Err(denial.to_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::PRIVILEGED_TIER;

    fn status() -> QuotaStatus {
        QuotaStatus {
            tier: "default".to_string(),
            limit: 60,
            remaining: 12,
            reset_at: DateTime::from_timestamp(1_700_000_060, 0).unwrap(),
            window: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_privileged_upgrade_only_from_default() {
        let request = AdmissionRequest::new(DEFAULT_TIER).with_privileged(true);
        assert_eq!(request.effective_tier(PRIVILEGED_TIER), PRIVILEGED_TIER);

        let request = AdmissionRequest::new("upload").with_privileged(true);
        assert_eq!(request.effective_tier(PRIVILEGED_TIER), "upload");

        let request = AdmissionRequest::new(DEFAULT_TIER);
        assert_eq!(request.effective_tier(PRIVILEGED_TIER), DEFAULT_TIER);
    }

    #[test]
    fn test_header_pairs() {
        let headers = status().header_pairs();

        assert_eq!(headers[0], (HEADER_LIMIT, "60".to_string()));
        assert_eq!(headers[1], (HEADER_REMAINING, "12".to_string()));
        assert_eq!(headers[2], (HEADER_RESET, "1700000060".to_string()));
        assert_eq!(headers[3], (HEADER_WINDOW, "60".to_string()));
    }

    #[test]
    fn test_denial_into_error() {
        let decision = AdmissionDecision::Denied(Denial {
            client: ClientIdentity::user("7"),
            reason: DenialReason::QuotaExceeded,
            retry_after_secs: 59,
            status: Some(status()),
        });

        assert!(!decision.is_allowed());
        let err = decision.into_result().unwrap_err();
        assert_eq!(err.retry_after_secs(), 59);
        assert_eq!(err.status_code(), 429);
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Try again in 59 seconds."
        );
    }

    #[test]
    fn test_denial_reason_serializes_snake_case() {
        let json = serde_json::to_string(&DenialReason::ClientBlocked).unwrap();
        assert_eq!(json, "\"client_blocked\"");
    }
}
