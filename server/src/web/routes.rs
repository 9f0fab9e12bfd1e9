// studio_booking_server/src/web/routes.rs

use actix_web::web;

use crate::errors::AppError;
use crate::web::handlers::{
  account_handlers, checkout_handlers, health_handlers, manage_handlers, session_handlers, webhook_handlers,
};

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  // Malformed bodies answer in the same JSON error shape as everything else.
  cfg.app_data(
    web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
  );
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_handlers::health_check_handler))
      // Catalog
      .service(
        web::scope("/sessions")
          .route("", web::get().to(session_handlers::list_sessions_handler))
          .route("/{session_id}", web::get().to(session_handlers::get_session_handler)),
      )
      // Checkout
      .service(
        web::scope("/checkout")
          .route("", web::post().to(checkout_handlers::start_checkout_handler))
          .route(
            "/{checkout_handle}/status",
            web::get().to(checkout_handlers::checkout_status_handler),
          ),
      )
      // Payment processor notifications; raw body, verified before parsing
      .service(
        web::scope("/webhooks").route("/stripe", web::post().to(webhook_handlers::stripe_webhook_handler)),
      )
      // Guest self-service
      .service(
        web::scope("/bookings/manage")
          .route("/{token}", web::get().to(manage_handlers::get_managed_booking_handler))
          .route(
            "/{token}/cancel",
            web::post().to(manage_handlers::cancel_managed_booking_handler),
          ),
      )
      // Signed-in customers
      .service(
        web::scope("/account")
          .route("/claim", web::post().to(account_handlers::claim_bookings_handler))
          .route("/bookings", web::get().to(account_handlers::list_my_bookings_handler))
          .route(
            "/bookings/{booking_id}/cancel",
            web::post().to(account_handlers::cancel_my_booking_handler),
          ),
      ),
  );
}
