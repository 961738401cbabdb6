//! Client identity derivation.

use std::fmt;

/// Opaque quota subject: `user_<id>` or `ip_<address>`.
///
/// Never parsed back; malformed addresses just become part of the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Identity for an authenticated user.
    pub fn user(user_id: &str) -> Self {
        Self(format!("user_{user_id}"))
    }

    /// Identity for an anonymous network origin.
    pub fn address(address: &str) -> Self {
        Self(format!("ip_{address}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-agnostic view of where a request came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    /// Raw value of the forwarded-origin header (`X-Forwarded-For`), if any.
    pub forwarded_for: Option<String>,
    /// Address of the direct connection peer, if known.
    pub peer_addr: Option<String>,
}

impl RequestOrigin {
    pub fn new(forwarded_for: Option<String>, peer_addr: Option<String>) -> Self {
        Self {
            forwarded_for,
            peer_addr,
        }
    }

    pub fn peer(addr: impl Into<String>) -> Self {
        Self {
            forwarded_for: None,
            peer_addr: Some(addr.into()),
        }
    }
}

/// Derives a stable [`ClientIdentity`] for a request.
#[derive(Debug, Clone, Copy)]
pub struct ClientIdentifier {
    trust_forwarded_for: bool,
}

impl Default for ClientIdentifier {
    fn default() -> Self {
        Self {
            trust_forwarded_for: true,
        }
    }
}

impl ClientIdentifier {
    pub fn new(trust_forwarded_for: bool) -> Self {
        Self {
            trust_forwarded_for,
        }
    }

    /// An authenticated user id wins over any network origin, so every
    /// origin used by one user shares a single quota.
    pub fn identify(&self, origin: &RequestOrigin, user_id: Option<&str>) -> ClientIdentity {
        if let Some(id) = user_id.filter(|id| !id.is_empty()) {
            return ClientIdentity::user(id);
        }

        let forwarded = self
            .trust_forwarded_for
            .then_some(origin.forwarded_for.as_deref())
            .flatten()
            .and_then(|header| header.split(',').next())
            .map(str::trim)
            .filter(|addr| !addr.is_empty());

        let address = forwarded
            .or(origin.peer_addr.as_deref())
            .unwrap_or("unknown");

        ClientIdentity::address(address)
    }
}
