//! Admission controller, the single entry point for protected call sites.

use std::sync::Arc;
use std::time::Duration;

use quotaguard_core::domain::PRIVILEGED_TIER;
use quotaguard_core::ports::{AdmissionControl, Clock};
use quotaguard_core::{
    AdmissionDecision, AdmissionRequest, ClientIdentifier, ClientIdentity, Denial, DenialReason,
    QuotaPolicyTable, QuotaStatus,
};

use super::{QuotaState, QuotaStats, secs_until};
use crate::{env_var, setting_or};

/// When and for how long repeat offenders are blocked.
///
/// Once a client's trailing violation count exceeds `threshold`, each further
/// violation blocks it for `min(max_block, block_step × (count − threshold))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub threshold: usize,
    pub block_step: Duration,
    pub max_block: Duration,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            threshold: 10,
            block_step: Duration::from_secs(300),
            max_block: Duration::from_secs(3600),
        }
    }
}

impl EscalationPolicy {
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Read `QUOTA_VIOLATION_THRESHOLD`, `QUOTA_BLOCK_STEP_SECS` and
    /// `QUOTA_BLOCK_MAX_SECS` through `lookup`. Missing or malformed values
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            threshold: setting_or(&lookup, "QUOTA_VIOLATION_THRESHOLD", defaults.threshold),
            block_step: Duration::from_secs(setting_or(
                &lookup,
                "QUOTA_BLOCK_STEP_SECS",
                defaults.block_step.as_secs(),
            )),
            max_block: Duration::from_secs(setting_or(
                &lookup,
                "QUOTA_BLOCK_MAX_SECS",
                defaults.max_block.as_secs(),
            )),
        }
    }

    /// Block length for a client with `violations` in the trailing window,
    /// or `None` if it has not crossed the threshold.
    pub fn block_duration(&self, violations: usize) -> Option<Duration> {
        let over = violations.checked_sub(self.threshold).filter(|n| *n > 0)?;
        let over = u32::try_from(over).unwrap_or(u32::MAX);

        Some(
            self.block_step
                .checked_mul(over)
                .map_or(self.max_block, |d| d.min(self.max_block)),
        )
    }
}

/// Composes identity, blocks, policy and counters into one decision.
///
/// Decision order: block short-circuit, privileged upgrade, policy lookup,
/// sliding-window check, then violation tracking and escalation on denial.
/// Nothing on this path can fail; unknown tiers degrade to the default tier.
pub struct AdmissionController {
    policies: QuotaPolicyTable,
    identifier: ClientIdentifier,
    escalation: EscalationPolicy,
    state: Arc<QuotaState>,
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    pub fn new(policies: QuotaPolicyTable, state: Arc<QuotaState>, clock: Arc<dyn Clock>) -> Self {
        Self {
            policies,
            identifier: ClientIdentifier::default(),
            escalation: EscalationPolicy::default(),
            state,
            clock,
        }
    }

    pub fn with_identifier(mut self, identifier: ClientIdentifier) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn with_escalation(mut self, escalation: EscalationPolicy) -> Self {
        self.escalation = escalation;
        self
    }

    pub fn policies(&self) -> &QuotaPolicyTable {
        &self.policies
    }

    pub fn state(&self) -> &Arc<QuotaState> {
        &self.state
    }

    pub fn stats(&self) -> QuotaStats {
        self.state.stats(self.clock.now())
    }

    /// Lift a client's block and forget its violations so the next denial
    /// does not immediately re-escalate.
    pub fn unblock(&self, client: &ClientIdentity) -> bool {
        let was_blocked = self.state.blocks.unblock(client);
        self.state.violations.clear(client);

        if was_blocked {
            tracing::info!(client = %client, "Client block lifted");
        }
        was_blocked
    }
}

impl AdmissionControl for AdmissionController {
    fn check(&self, request: &AdmissionRequest) -> AdmissionDecision {
        let now = self.clock.now();
        let client = self
            .identifier
            .identify(&request.origin, request.user_id.as_deref());

        if let Some(retry_after_secs) = self.state.blocks.is_blocked(&client, now) {
            tracing::debug!(client = %client, retry_after_secs, "Blocked client rejected");
            return AdmissionDecision::Denied(Denial {
                client,
                reason: DenialReason::ClientBlocked,
                retry_after_secs,
                status: None,
            });
        }

        let requested = request.effective_tier(PRIVILEGED_TIER);
        let resolution = self.policies.resolve(requested);
        if resolution.is_fallback() {
            tracing::warn!(tier = %requested, "Unknown quota tier, using default");
        }
        let policy = resolution.tier();

        let check = self.state.counters.record_and_check(&client, policy, now);
        let status = QuotaStatus {
            tier: policy.name().to_string(),
            limit: policy.max_requests(),
            remaining: check.remaining,
            reset_at: check.reset_at,
            window: policy.window(),
        };

        if check.allowed {
            return AdmissionDecision::Allowed(status);
        }

        let retry_after_secs = secs_until(now, check.reset_at);
        let violations = self.state.violations.record_violation(&client, now);

        if let Some(duration) = self.escalation.block_duration(violations) {
            let expires_at = self.state.blocks.block(&client, duration, now);
            let retry_after_secs = retry_after_secs.max(secs_until(now, expires_at));

            tracing::warn!(
                client = %client,
                tier = %policy.name(),
                violations,
                block_secs = duration.as_secs(),
                expires_at = %expires_at,
                "Client blocked after repeated rate limit violations"
            );

            return AdmissionDecision::Denied(Denial {
                client,
                reason: DenialReason::ClientBlocked,
                retry_after_secs,
                status: Some(status),
            });
        }

        tracing::debug!(
            client = %client,
            tier = %policy.name(),
            violations,
            retry_after_secs,
            "Rate limit exceeded"
        );

        AdmissionDecision::Denied(Denial {
            client,
            reason: DenialReason::QuotaExceeded,
            retry_after_secs,
            status: Some(status),
        })
    }
}
