use actix_web::{web, HttpResponse, Responder};
use health_monitor::MonitorError;
use log::{info, warn};

use crate::controllers::internal_error;
use crate::models::monitoring::MonitoringRequest;
use crate::models::ApiResponse;
use crate::state::AppState;

pub const INVALID_ACTION_MESSAGE: &str = r#"Action invalide. Utilisez "start" ou "stop""#;

// Start or stop the recurring monitoring cycle
pub async fn toggle_monitoring(
    data: web::Data<AppState>,
    request: web::Json<MonitoringRequest>,
) -> impl Responder {
    let request = request.into_inner();
    info!("Request to toggle monitoring: {:?}", request);

    match request.action.as_deref() {
        Some("start") => match data.monitor.start(request.interval_minutes).await {
            Ok(minutes) => HttpResponse::Ok().json(ApiResponse::message_with_data(
                format!("Monitoring démarré avec un intervalle de {} minutes", minutes),
                data.monitor.status().await,
            )),
            Err(e @ MonitorError::InvalidInterval(_)) => {
                warn!("Rejected monitoring interval: {}", e);
                HttpResponse::BadRequest().json(ApiResponse::failure(e.to_string(), None))
            }
            Err(e) => internal_error("starting monitoring", &e),
        },
        Some("stop") => {
            data.monitor.stop().await;
            HttpResponse::Ok().json(ApiResponse::message_with_data(
                "Monitoring arrêté",
                data.monitor.status().await,
            ))
        }
        _ => HttpResponse::BadRequest().json(ApiResponse::failure(INVALID_ACTION_MESSAGE, None)),
    }
}

// Current state of the monitoring session
pub async fn get_monitoring_status(data: web::Data<AppState>) -> impl Responder {
    info!("Request for monitoring status");
    HttpResponse::Ok().json(ApiResponse::data(data.monitor.status().await))
}
