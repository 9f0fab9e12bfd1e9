// studio_booking_server/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use studio_booking::CheckoutStart;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::MaybeUser;

#[instrument(
    name = "handler::start_checkout",
    skip(app_state, user, body),
    fields(session_id = %body.session_id, user_id = ?user.0.as_ref().map(|u| u.user_id))
)]
pub async fn start_checkout_handler(
  app_state: web::Data<AppState>,
  user: MaybeUser,
  body: web::Json<CheckoutStart>,
) -> Result<HttpResponse, AppError> {
  let mut request = body.into_inner();
  request.owner_id = user.0.map(|u| u.user_id);

  match app_state.services.checkout.start_checkout(request, Utc::now()).await {
    Ok(started) => {
      info!("Checkout started for booking {}.", started.booking_id);
      Ok(HttpResponse::Ok().json(started))
    }
    Err(e) => {
      warn!("Checkout could not be started: {}", e);
      Err(e.into())
    }
  }
}

/// Status read for the post-payment page, bounded by the configured poll policy.
#[instrument(name = "handler::checkout_status", skip(app_state))]
pub async fn checkout_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let handle = path.into_inner();
  let result = app_state.services.poller.poll(&handle).await?;
  if !result.settled {
    info!("Booking {} still pending after {} attempts.", result.booking_id, result.attempts);
  }
  Ok(HttpResponse::Ok().json(result))
}
