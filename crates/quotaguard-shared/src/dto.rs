//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Quota metadata for the tier that admitted a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatusResponse {
    pub tier: String,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the oldest counted request leaves the window.
    pub reset: i64,
    /// Window length in seconds.
    pub window: u64,
}

/// Sizes of the in-memory quota stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatsResponse {
    pub counter_keys: usize,
    pub clients_with_violations: usize,
    pub active_blocks: usize,
}

/// Response from a protected operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResponse {
    pub operation: String,
    pub quota: QuotaStatusResponse,
}
