//! Middleware modules.

pub mod error;
pub mod quota;

#[cfg(feature = "auth")]
pub mod auth;
