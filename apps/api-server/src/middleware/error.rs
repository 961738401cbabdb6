//! Error handling - RFC 7807 compliant responses.

use std::fmt;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use quotaguard_core::domain::HEADER_RETRY_AFTER;
use quotaguard_core::{Denial, QuotaError, QuotaStatus};
use quotaguard_shared::ErrorResponse;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    /// Request denied by admission control.
    TooManyRequests {
        error: QuotaError,
        status: Option<QuotaStatus>,
    },
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::TooManyRequests { error, .. } => write!(f, "{}", error),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::TooManyRequests { error, status } => {
                let retry_after = error.retry_after_secs();

                let mut response = HttpResponse::build(self.status_code());
                response.insert_header((HEADER_RETRY_AFTER, retry_after.to_string()));
                if let Some(status) = status {
                    for header in status.header_pairs() {
                        response.insert_header(header);
                    }
                }

                response.json(ErrorResponse::too_many_requests(error.to_string(), retry_after))
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                HttpResponse::build(self.status_code()).json(ErrorResponse::internal_error())
            }
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        AppError::TooManyRequests {
            error: denial.to_error(),
            status: denial.status,
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use quotaguard_core::{ClientIdentity, DenialReason};

    #[actix_web::test]
    async fn test_blocked_denial_response() {
        let error = AppError::from(Denial {
            client: ClientIdentity::address("192.0.2.1"),
            reason: DenialReason::ClientBlocked,
            retry_after_secs: 300,
            status: None,
        });

        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("retry-after").unwrap(), "300");
        assert!(response.headers().get("x-ratelimit-limit").is_none());

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["retry_after"], 300);
        assert_eq!(
            json["detail"],
            "Too many rate limit violations. Access is blocked; try again in 300 seconds."
        );
    }
}
