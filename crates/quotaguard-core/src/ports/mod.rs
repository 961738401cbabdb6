//! Ports - trait definitions for the seams between quota logic and its
//! environment. Infrastructure and transports implement or consume these.

mod admission;
mod auth;
mod clock;

pub use admission::AdmissionControl;
pub use auth::{AuthError, PRIVILEGED_ROLE, TokenClaims, TokenService};
pub use clock::{Clock, ManualClock, SystemClock};
