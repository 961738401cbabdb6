//! # Quotaguard Core
//!
//! The domain layer of Quotaguard: quota policies, client identities and
//! admission decisions. This crate is pure logic with no runtime or I/O.

pub mod domain;
pub mod error;
pub mod ports;

pub use domain::{
    AdmissionDecision, AdmissionRequest, ClientIdentifier, ClientIdentity, Denial, DenialReason,
    PolicyResolution, PolicyTier, QuotaPolicyTable, QuotaStatus, RequestOrigin,
};
pub use error::{ConfigError, QuotaError};
