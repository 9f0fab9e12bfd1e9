// studio_booking_server/src/web/handlers/health_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::state::AppState;

pub async fn health_check_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  if let Some(pool) = &app_state.db_pool {
    sqlx::query("SELECT 1").execute(pool).await?;
  }
  Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}
