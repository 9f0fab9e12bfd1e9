// studio_booking_server/src/state.rs
use crate::config::AppConfig;
use sqlx::PgPool;
use std::sync::Arc;
use studio_booking::BookingServices;

#[derive(Clone)]
pub struct AppState {
  pub services: Arc<BookingServices>,
  pub config: Arc<AppConfig>,
  /// Absent when the app runs over the in-memory store.
  pub db_pool: Option<PgPool>,
}
