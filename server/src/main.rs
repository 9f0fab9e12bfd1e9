// studio_booking_server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;

use studio_booking_server::config::AppConfig;
use studio_booking_server::services::expiry_task;
use studio_booking_server::{build_state, init_tracing, web};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  init_tracing();
  tracing::info!("Starting studio booking server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let app_state = match build_state(app_config.clone()).await {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise application state.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  match app_state.services.sweeper.clone() {
    Some(sweeper) => {
      expiry_task::spawn(sweeper, app_config.sweep_interval);
    }
    None => tracing::info!("No pending hold window configured; expiry sweeper disabled."),
  }

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
