//! Admission control port.

use crate::domain::{AdmissionDecision, AdmissionRequest};

/// Admission control - the single entry point protected call sites use.
///
/// Implementations work purely in memory and never suspend, so the trait is
/// synchronous and safe to call directly from request handlers.
pub trait AdmissionControl: Send + Sync {
    /// Decide whether the request may proceed, recording it if so.
    fn check(&self, request: &AdmissionRequest) -> AdmissionDecision;
}
