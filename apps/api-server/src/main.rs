//! # Quotaguard API Server
//!
//! Actix-web server that enforces per-client quotas on its protected routes.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

use quotaguard_core::ports::{Clock, SystemClock};
use quotaguard_infra::{QuotaState, ReclamationSweeper};

mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Quotaguard API Server on {}:{}",
        config.host,
        config.port
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let quota = Arc::new(QuotaState::new(config.violation_window));
    let state = AppState::new(&config, quota.clone(), clock.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    let sweeper = ReclamationSweeper::new(quota, clock, config.sweeper.clone()).spawn();

    let result = server.await;

    sweeper.shutdown().await;
    tracing::info!("Server stopped");

    result
}
