//! Authentication port.
//!
//! Identity verification itself belongs to an external provider; quota
//! enforcement only needs the resolved user id and the privileged flag.

/// Role that marks a client as eligible for the privileged tier.
pub const PRIVILEGED_ROLE: &str = "subscriber";

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: String,
    pub roles: Vec<String>,
    pub exp: i64,
}

impl TokenClaims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Verified subscribers get the richer quota.
    pub fn is_privileged(&self) -> bool {
        self.has_role(PRIVILEGED_ROLE)
    }
}

/// Token service trait for bearer token operations.
pub trait TokenService: Send + Sync {
    /// Issue an access token for a user.
    fn generate_token(&self, user_id: &str, roles: Vec<String>) -> Result<String, AuthError>;

    /// Validate and decode a token.
    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing authorization header")]
    MissingAuth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_role_is_privileged() {
        let claims = TokenClaims {
            user_id: "42".to_string(),
            roles: vec!["user".to_string(), PRIVILEGED_ROLE.to_string()],
            exp: 0,
        };
        assert!(claims.is_privileged());

        let claims = TokenClaims {
            roles: vec!["user".to_string()],
            ..claims
        };
        assert!(!claims.is_privileged());
    }
}
