//! Protected operations.
//!
//! What these operations actually do lives in other services; the handlers
//! only acknowledge the call and echo the quota that admitted it.

use actix_web::{HttpMessage, HttpRequest, HttpResponse};
use quotaguard_core::QuotaStatus;
use quotaguard_shared::ApiResponse;
use quotaguard_shared::dto::{OperationResponse, QuotaStatusResponse};

use crate::middleware::error::{AppError, AppResult};

fn accepted(req: &HttpRequest, operation: &str) -> AppResult<HttpResponse> {
    let status = req
        .extensions()
        .get::<QuotaStatus>()
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("Operation '{operation}' is not quota guarded")))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(OperationResponse {
        operation: operation.to_string(),
        quota: QuotaStatusResponse {
            tier: status.tier.clone(),
            limit: status.limit,
            remaining: status.remaining,
            reset: status.reset_epoch_secs(),
            window: status.window.as_secs(),
        },
    })))
}

/// GET /api/ops/status
pub async fn status(req: HttpRequest) -> AppResult<HttpResponse> {
    accepted(&req, "status")
}

/// POST /api/ops/heavy
pub async fn heavy(req: HttpRequest) -> AppResult<HttpResponse> {
    accepted(&req, "heavy")
}

/// POST /api/ops/upload
pub async fn upload(req: HttpRequest) -> AppResult<HttpResponse> {
    accepted(&req, "upload")
}

/// POST /api/ops/workflow
pub async fn workflow(req: HttpRequest) -> AppResult<HttpResponse> {
    accepted(&req, "workflow")
}

/// GET /api/ops/export
pub async fn export(req: HttpRequest) -> AppResult<HttpResponse> {
    accepted(&req, "export")
}
