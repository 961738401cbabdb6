//! Bearer token resolution.
//!
//! Verifying who a caller is belongs to the identity provider; quota
//! enforcement only consumes the resulting user id and privilege flag.
//! Requests without a valid token are treated as anonymous.

use actix_web::{HttpRequest, http::header};

use quotaguard_core::ports::{AuthError, TokenClaims, TokenService};

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;

    value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))
}

/// Resolve the caller's claims, or `None` for anonymous callers.
pub fn resolve_claims(req: &HttpRequest, tokens: &dyn TokenService) -> Option<TokenClaims> {
    let result = bearer_token(req).and_then(|token| tokens.validate_token(token));

    match result {
        Ok(claims) => Some(claims),
        Err(AuthError::MissingAuth) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid bearer token for quota identity");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use quotaguard_infra::{JwtConfig, JwtTokenService};

    fn service() -> JwtTokenService {
        JwtTokenService::new(JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
            issuer: "test".to_string(),
        })
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        let req = TestRequest::default().to_http_request();

        assert!(matches!(bearer_token(&req), Err(AuthError::MissingAuth)));
        assert!(resolve_claims(&req, &service()).is_none());
    }

    #[test]
    fn test_valid_token_resolves_claims() {
        let tokens = service();
        let token = tokens.generate_token("42", vec![]).unwrap();
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();

        let claims = resolve_claims(&req, &tokens).unwrap();
        assert_eq!(claims.user_id, "42");
    }

    #[test]
    fn test_malformed_header_is_anonymous() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic Zm9vOmJhcg=="))
            .to_http_request();

        assert!(matches!(bearer_token(&req), Err(AuthError::InvalidToken(_))));
        assert!(resolve_claims(&req, &service()).is_none());
    }
}
