// studio_booking_server/src/web/handlers/session_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::list_sessions", skip(app_state))]
pub async fn list_sessions_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let entries = app_state.services.catalog.list_bookable(Utc::now()).await?;
  info!("Listed {} bookable sessions.", entries.len());
  Ok(HttpResponse::Ok().json(entries))
}

#[instrument(name = "handler::get_session", skip(app_state), fields(session_id = %path))]
pub async fn get_session_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let entry = app_state.services.catalog.get_entry(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(entry))
}
