pub mod health;
pub mod monitoring;
pub mod notification;

use actix_web::HttpResponse;
use log::error;

use crate::models::ApiResponse;

pub const INTERNAL_ERROR_MESSAGE: &str = "Erreur interne du serveur";

// Log and turn an unexpected failure into the generic 500 response
pub fn internal_error(context: &str, err: &dyn std::fmt::Display) -> HttpResponse {
    error!("Error while {}: {}", context, err);
    HttpResponse::InternalServerError()
        .json(ApiResponse::failure(INTERNAL_ERROR_MESSAGE, Some(err.to_string())))
}
