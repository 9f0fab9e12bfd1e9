// studio_booking_server/src/web/handlers/manage_handlers.rs

//! Guest self-service through the management token in the URL.

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::manage_booking", skip_all)]
pub async fn get_managed_booking_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let managed = app_state.services.access.resolve(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(managed))
}

#[instrument(name = "handler::cancel_managed_booking", skip_all)]
pub async fn cancel_managed_booking_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let outcome = app_state.services.access.cancel_by_token(&path.into_inner()).await?;
  info!(outcome = ?outcome, "Guest cancellation handled.");
  Ok(HttpResponse::Ok().json(outcome))
}
