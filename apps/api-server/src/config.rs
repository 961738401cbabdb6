//! Application configuration loaded from environment variables.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use quotaguard_core::{PolicyTier, QuotaPolicyTable};
use quotaguard_infra::{EscalationPolicy, SweeperConfig};

const TIER_PREFIX: &str = "QUOTA_TIER_";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Honor `X-Forwarded-For` when identifying anonymous clients.
    pub trust_forwarded_for: bool,
    pub policies: QuotaPolicyTable,
    pub escalation: EscalationPolicy,
    /// Trailing window over which violations count toward escalation.
    pub violation_window: Duration,
    pub sweeper: SweeperConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Load configuration from `KEY=value` pairs. Missing or malformed
    /// values keep their defaults.
    pub fn from_vars(vars: impl Iterator<Item = (String, String)>) -> Self {
        let vars: HashMap<String, String> = vars.collect();
        let lookup = |key: &str| vars.get(key).cloned();

        let mut policies = QuotaPolicyTable::with_defaults();
        for tier in Self::parse_tier_overrides(vars.iter()) {
            tracing::info!(
                tier = %tier.name(),
                max_requests = tier.max_requests(),
                window_secs = tier.window().as_secs(),
                "Quota tier configured from environment"
            );
            policies.insert(tier);
        }

        let sweeper = SweeperConfig::from_lookup(lookup).covering(policies.longest_window());

        Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            trust_forwarded_for: lookup("TRUST_FORWARDED_FOR")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            policies,
            escalation: EscalationPolicy::from_lookup(lookup),
            violation_window: Duration::from_secs(
                lookup("QUOTA_VIOLATION_WINDOW_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            sweeper,
        }
    }

    /// Parse tier definitions from environment.
    /// Format: QUOTA_TIER_<NAME>=<MAX_REQUESTS>,<WINDOW_SECS>
    /// Example: QUOTA_TIER_BULK_EXPORT=50,300 defines tier `bulk-export`.
    fn parse_tier_overrides<'a>(
        vars: impl Iterator<Item = (&'a String, &'a String)>,
    ) -> Vec<PolicyTier> {
        let mut tiers = Vec::new();

        for (key, value) in vars {
            let Some(raw_name) = key.strip_prefix(TIER_PREFIX) else {
                continue;
            };
            let name = raw_name.to_lowercase().replace('_', "-");

            let parsed = value.split_once(',').and_then(|(max, window)| {
                Some((
                    max.trim().parse::<u32>().ok()?,
                    window.trim().parse::<u64>().ok()?,
                ))
            });
            let Some((max_requests, window_secs)) = parsed else {
                tracing::warn!(var = %key, value = %value, "Ignoring malformed quota tier");
                continue;
            };

            match PolicyTier::new(name, max_requests, Duration::from_secs(window_secs)) {
                Ok(tier) => tiers.push(tier),
                Err(e) => tracing::warn!(var = %key, error = %e, "Ignoring invalid quota tier"),
            }
        }

        tiers
    }
}
