//! Application state - shared across all handlers.

use std::sync::Arc;

use quotaguard_core::ClientIdentifier;
use quotaguard_core::ports::Clock;
use quotaguard_infra::{AdmissionController, QuotaState};

#[cfg(feature = "auth")]
use quotaguard_core::ports::TokenService;
#[cfg(feature = "auth")]
use quotaguard_infra::JwtTokenService;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    #[cfg(feature = "auth")]
    pub tokens: Arc<dyn TokenService>,
}

impl AppState {
    /// Build the application state around an existing quota store.
    pub fn new(config: &AppConfig, quota: Arc<QuotaState>, clock: Arc<dyn Clock>) -> Self {
        let admission = AdmissionController::new(config.policies.clone(), quota, clock)
            .with_identifier(ClientIdentifier::new(config.trust_forwarded_for))
            .with_escalation(config.escalation.clone());

        tracing::info!(
            tiers = config.policies.len(),
            trust_forwarded_for = config.trust_forwarded_for,
            "Application state initialized"
        );

        Self {
            admission: Arc::new(admission),
            #[cfg(feature = "auth")]
            tokens: Arc::new(JwtTokenService::from_env()),
        }
    }
}

/// State over a fresh quota store with a fixed clock and test JWT secret.
#[cfg(test)]
pub(crate) fn test_state(policies: quotaguard_core::QuotaPolicyTable) -> AppState {
    use quotaguard_core::ports::ManualClock;

    let clock = Arc::new(ManualClock::at_epoch_secs(1_700_000_000));
    let admission = AdmissionController::new(policies, Arc::new(QuotaState::default()), clock);

    AppState {
        admission: Arc::new(admission),
        #[cfg(feature = "auth")]
        tokens: Arc::new(JwtTokenService::new(quotaguard_infra::JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
            issuer: "test".to_string(),
        })),
    }
}
