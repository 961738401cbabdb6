//! HTTP handlers and route configuration.

mod health;
mod ops;
mod quota;

use actix_web::web;
use quotaguard_core::domain::{
    BULK_EXPORT_TIER, DEFAULT_TIER, HEAVY_OPERATION_TIER, SENSITIVE_WORKFLOW_TIER, UPLOAD_TIER,
};

use crate::middleware::quota::QuotaGuard;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Unmetered
            .route("/health", web::get().to(health::health_check))
            .service(
                web::resource("/quota/stats")
                    .wrap(QuotaGuard::tier(DEFAULT_TIER))
                    .route(web::get().to(quota::stats)),
            )
            // Protected operations, one tier per call site
            .service(
                web::scope("/ops")
                    .service(
                        web::resource("/status")
                            .wrap(QuotaGuard::tier(DEFAULT_TIER))
                            .route(web::get().to(ops::status)),
                    )
                    .service(
                        web::resource("/heavy")
                            .wrap(QuotaGuard::tier(HEAVY_OPERATION_TIER))
                            .route(web::post().to(ops::heavy)),
                    )
                    .service(
                        web::resource("/upload")
                            .wrap(QuotaGuard::tier(UPLOAD_TIER))
                            .route(web::post().to(ops::upload)),
                    )
                    .service(
                        web::resource("/workflow")
                            .wrap(QuotaGuard::tier(SENSITIVE_WORKFLOW_TIER))
                            .route(web::post().to(ops::workflow)),
                    )
                    .service(
                        web::resource("/export")
                            .wrap(QuotaGuard::tier(BULK_EXPORT_TIER))
                            .route(web::get().to(ops::export)),
                    ),
            ),
    );
}
