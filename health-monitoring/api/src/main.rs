mod controllers;
mod models;
mod services;
mod state;

use actix_web::error::InternalError;
use actix_web::{web, App, HttpResponse, HttpServer};
use dotenv::dotenv;
use health_monitor::Config;
use log::{error, info, warn};
use std::env;

use crate::controllers::{health, monitoring, notification};
use crate::models::ApiResponse;
use crate::services::health::health_check;
use crate::state::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        warn!("Rejected request body: {}", err);
        let response = HttpResponse::BadRequest()
            .json(ApiResponse::failure("Corps de requête invalide", Some(err.to_string())));
        InternalError::from_response(err, response).into()
    }))
    .route("/health", web::get().to(health_check))
    .route("/health/all", web::get().to(health::get_all_services))
    .route("/health/service/{service_name}", web::get().to(health::get_service_health))
    .route("/health/check", web::post().to(health::trigger_check))
    .route(
        "/health/test-notification",
        web::post().to(notification::send_test_notification),
    )
    .route("/health/monitoring", web::get().to(monitoring::get_monitoring_status))
    .route("/health/monitoring", web::post().to(monitoring::toggle_monitoring));
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Monitoring {} services (alert policy: {:?}, default interval: {} minutes)",
        config.services.len(),
        config.alert_policy,
        config.monitoring_interval_minutes
    );
    if config.discord_webhook_url.is_none() {
        warn!("DISCORD_WEBHOOK_URL is not set, notifications will fail");
    }

    let state = match AppState::from_config(&config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            error!("Failed to build application state: {}", e);
            std::process::exit(1);
        }
    };

    if config.autostart {
        if let Err(e) = state.monitor.start(None).await {
            error!("Failed to start monitoring: {}", e);
        }
    }

    let host = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    info!("Server is live at http://{}:{}", host, port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
