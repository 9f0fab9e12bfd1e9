// studio_booking_server/src/lib.rs

//! HTTP surface of the studio booking site: actix-web routes over the booking
//! core, a Postgres store and the Stripe checkout client.

pub mod config;
pub mod db;
pub mod errors;
pub mod services;
pub mod state;
pub mod web;

use std::sync::Arc;
use studio_booking::{BookingServices, BookingStore, PaymentProcessor};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::services::StripeProcessor;
use crate::state::AppState;

pub fn init_tracing() {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();
}

/// Wires the booking core over the given store and processor.
pub fn build_services(
  store: Arc<dyn BookingStore>,
  processor: Arc<dyn PaymentProcessor>,
  config: &AppConfig,
) -> Result<BookingServices> {
  let services = BookingServices::new(store, processor, config.booking_config(), &config.stripe_webhook_secret)?
    .with_poll_policy(config.poll_policy());
  Ok(services)
}

/// Production state: Postgres store with migrations applied, Stripe processor.
pub async fn build_state(config: Arc<AppConfig>) -> Result<AppState> {
  let pool = db::connect(&config.database_url).await?;
  tracing::info!("Successfully connected to the database.");
  db::run_migrations(&pool).await?;

  let store = Arc::new(db::PgBookingStore::new(pool.clone()));
  if config.seed_db {
    db::seed::seed_sessions(store.as_ref(), chrono::Utc::now()).await?;
  }

  let processor = StripeProcessor::new(&config.stripe_api_base, &config.stripe_secret_key, config.processor_timeout)
    .map_err(|e| AppError::Config(e.to_string()))?;
  let services = build_services(store, Arc::new(processor), &config)?;

  Ok(AppState {
    services: Arc::new(services),
    config,
    db_pool: Some(pool),
  })
}
