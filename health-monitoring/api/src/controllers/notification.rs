use actix_web::{web, HttpResponse, Responder};
use health_monitor::Notifier;
use log::{info, warn};

use crate::controllers::internal_error;
use crate::models::monitoring::{NotificationKind, NotificationQuery};
use crate::models::ApiResponse;
use crate::state::AppState;

pub const DELIVERY_FAILED_MESSAGE: &str = "Échec de l'envoi de la notification Discord";

// Send a test message through the notification channel
pub async fn send_test_notification(
    data: web::Data<AppState>,
    query: web::Query<NotificationQuery>,
) -> impl Responder {
    let kind = NotificationKind::from(query.kind.as_deref());
    info!("Request to send a test notification of type {}", kind.as_str());

    match data
        .notifier
        .send_notification(kind.test_message(), kind.is_alert())
        .await
    {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::message(format!(
            "Notification Discord de type {} envoyée avec succès",
            kind.as_str()
        ))),
        Err(e) if e.is_delivery_failure() => {
            warn!("Test notification was not delivered: {}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::failure(DELIVERY_FAILED_MESSAGE, Some(e.to_string())))
        }
        Err(e) => internal_error("sending test notification", &e),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{test, web, App};
    use serde_json::Value;
    use std::sync::Arc;

    use super::DELIVERY_FAILED_MESSAGE;
    use crate::configure_routes;
    use crate::models::monitoring::NotificationKind;
    use crate::state::test_support::{app_state, Delivery, StubNotifier};

    async fn send(notifier: Arc<StubNotifier>, uri: &str) -> (u16, Value) {
        let state = web::Data::new(app_state(&["auth"], notifier));
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::post().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status().as_u16();
        (status, test::read_body_json(resp).await)
    }

    #[actix_web::test]
    async fn test_defaults_to_info() {
        let notifier = Arc::new(StubNotifier::default());
        let (status, body) = send(notifier.clone(), "/health/test-notification").await;

        assert_eq!(status, 200);
        assert_eq!(body["message"], "Notification Discord de type info envoyée avec succès");
        let sent = notifier.sent.lock().await;
        assert_eq!(sent[0].0, NotificationKind::Info.test_message());
        assert!(!sent[0].1);
    }

    #[actix_web::test]
    async fn test_alert_type() {
        let notifier = Arc::new(StubNotifier::default());
        let (status, body) = send(notifier.clone(), "/health/test-notification?type=alert").await;

        assert_eq!(status, 200);
        assert_eq!(body["message"], "Notification Discord de type alert envoyée avec succès");
        let sent = notifier.sent.lock().await;
        assert_eq!(sent[0].0, NotificationKind::Alert.test_message());
        assert!(sent[0].1);
    }

    #[actix_web::test]
    async fn test_rejected_delivery_is_500() {
        for delivery in [Delivery::Rejected, Delivery::Unconfigured] {
            let notifier = Arc::new(StubNotifier {
                delivery,
                ..Default::default()
            });
            let (status, body) = send(notifier, "/health/test-notification?type=info").await;

            assert_eq!(status, 500);
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], DELIVERY_FAILED_MESSAGE);
        }
    }

    #[actix_web::test]
    async fn test_crashed_notifier_is_internal_error() {
        let notifier = Arc::new(StubNotifier {
            delivery: Delivery::Crashed,
            ..Default::default()
        });
        let (status, body) = send(notifier, "/health/test-notification").await;

        assert_eq!(status, 500);
        assert_eq!(body["message"], "Erreur interne du serveur");
    }
}
