// studio_booking_server/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;
use studio_booking::BookingError;
use tracing::{error, info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Every reconcile outcome is acknowledged with 200. Bad signatures and
/// unparseable bodies get 400, transient storage failures 500; both make the
/// processor redeliver.
#[instrument(name = "handler::stripe_webhook", skip(app_state, req, body), fields(payload_bytes = body.len()))]
pub async fn stripe_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|value| value.to_str().ok())
    .unwrap_or_default();

  match app_state.services.reconciler.receive(&body, signature, Utc::now()).await {
    Ok(outcome) => {
      info!(outcome = ?outcome, "Webhook acknowledged.");
      Ok(HttpResponse::Ok().json(json!({ "received": true, "outcome": outcome })))
    }
    Err(e @ (BookingError::InvalidSignature(_) | BookingError::MalformedEvent(_))) => {
      warn!("Webhook rejected: {}", e);
      Err(e.into())
    }
    Err(e) => {
      error!("Webhook processing failed, the processor will redeliver: {}", e);
      Err(e.into())
    }
  }
}
