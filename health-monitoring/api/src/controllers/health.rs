use actix_web::{web, HttpResponse, Responder};
use health_monitor::MonitorError;
use log::info;

use crate::controllers::internal_error;
use crate::models::ApiResponse;
use crate::state::AppState;

// Probe a single service by name
pub async fn get_service_health(
    data: web::Data<AppState>,
    service_name: web::Path<String>,
) -> impl Responder {
    let name = service_name.into_inner();
    info!("Request for health of service: {}", name);

    match data.monitor.aggregator().check_service_health(&name).await {
        Ok(status) => HttpResponse::Ok().json(ApiResponse::data(status)),
        Err(MonitorError::NotFound(name)) => {
            info!("Service not found: {}", name);
            HttpResponse::NotFound()
                .json(ApiResponse::failure(format!("Service {} non trouvé", name), None))
        }
        Err(e) => internal_error("checking service health", &e),
    }
}

// Probe every registered service
pub async fn get_all_services(data: web::Data<AppState>) -> impl Responder {
    info!("Request for health of all services");

    match data.monitor.aggregator().snapshot().await {
        Ok(snapshot) => {
            info!("Returning health of {} services", snapshot.services.len());
            HttpResponse::Ok().json(ApiResponse::data(snapshot))
        }
        Err(e) => internal_error("checking all services", &e),
    }
}

// Run one monitoring cycle right now
pub async fn trigger_check(data: web::Data<AppState>) -> impl Responder {
    info!("Request for a manual health check");

    match data.monitor.run_cycle().await {
        Ok(snapshot) => HttpResponse::Ok().json(ApiResponse::message_with_data(
            "Vérification de santé effectuée avec succès",
            snapshot,
        )),
        Err(e) => internal_error("running manual health check", &e),
    }
}
