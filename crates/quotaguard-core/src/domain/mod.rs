//! Domain types for quota enforcement.

mod decision;
mod identity;
mod policy;

pub use decision::{
    AdmissionDecision, AdmissionRequest, Denial, DenialReason, HEADER_LIMIT, HEADER_REMAINING,
    HEADER_RESET, HEADER_RETRY_AFTER, HEADER_WINDOW, QuotaStatus,
};
pub use identity::{ClientIdentifier, ClientIdentity, RequestOrigin};
pub use policy::{
    BULK_EXPORT_TIER, DEFAULT_TIER, HEAVY_OPERATION_TIER, MAX_WINDOW, PRIVILEGED_TIER,
    PolicyResolution, PolicyTier, QuotaPolicyTable, SENSITIVE_WORKFLOW_TIER, UPLOAD_TIER,
};
