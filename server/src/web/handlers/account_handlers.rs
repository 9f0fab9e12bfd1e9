// studio_booking_server/src/web/handlers/account_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

/// Called once per sign-in. Links guest bookings made with the account's email.
#[instrument(name = "handler::claim_bookings", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn claim_bookings_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let email = auth_user
    .email
    .as_deref()
    .ok_or_else(|| AppError::Validation("Account has no email address".to_string()))?;
  let claimed = app_state
    .services
    .access
    .claim_guest_bookings(auth_user.user_id, email)
    .await?;
  info!("Claimed {} guest bookings.", claimed.len());
  Ok(HttpResponse::Ok().json(json!({ "claimed": claimed })))
}

#[instrument(name = "handler::my_bookings", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_my_bookings_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let bookings = app_state.services.access.list_for_owner(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(bookings))
}

#[instrument(
    name = "handler::cancel_my_booking",
    skip(app_state, auth_user),
    fields(user_id = %auth_user.user_id, booking_id = %path)
)]
pub async fn cancel_my_booking_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let outcome = app_state
    .services
    .access
    .cancel_for_owner(auth_user.user_id, path.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(outcome))
}
