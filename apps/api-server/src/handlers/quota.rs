//! Quota store statistics.

use actix_web::{HttpResponse, web};
use quotaguard_shared::ApiResponse;
use quotaguard_shared::dto::QuotaStatsResponse;

use crate::state::AppState;

/// GET /api/quota/stats
pub async fn stats(state: web::Data<AppState>) -> HttpResponse {
    let stats = state.admission.stats();

    HttpResponse::Ok().json(ApiResponse::ok(QuotaStatsResponse {
        counter_keys: stats.counter_keys,
        clients_with_violations: stats.clients_with_violations,
        active_blocks: stats.active_blocks,
    }))
}
