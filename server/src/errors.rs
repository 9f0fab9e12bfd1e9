// studio_booking_server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use studio_booking::BookingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Migration Error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("{source}")]
  Booking {
    #[from]
    source: BookingError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<BookingError>() {
      Ok(booking_err) => AppError::Booking { source: booking_err },
      Err(err) => match err.downcast::<sqlx::Error>() {
        Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
        Err(err) => AppError::Internal(err.to_string()),
      },
    }
  }
}

fn booking_status(err: &BookingError) -> StatusCode {
  match err {
    BookingError::SessionNotFound { .. } | BookingError::BookingNotFound => StatusCode::NOT_FOUND,
    BookingError::SessionNotBookable { .. }
    | BookingError::SessionFull { .. }
    | BookingError::InvalidContact(_)
    | BookingError::NoPrice { .. }
    | BookingError::InvalidSignature(_)
    | BookingError::MalformedEvent(_)
    | BookingError::InvalidSession(_) => StatusCode::BAD_REQUEST,
    BookingError::NotOwner => StatusCode::FORBIDDEN,
    BookingError::CancellationRequiresReview => StatusCode::CONFLICT,
    BookingError::CheckoutCreationFailed { .. }
    | BookingError::IllegalTransition { .. }
    | BookingError::Config(_)
    | BookingError::Flow { .. }
    | BookingError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Booking { source } => booking_status(source),
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Migrate(_) | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::info!(application_error = %self, status = status.as_u16(), "Rejected request");
    }

    // Internal failures never leak their detail to the client.
    let body = match self {
      AppError::Sqlx(_) | AppError::Migrate(_) => json!({"error": "Database operation failed"}),
      AppError::Config(_) | AppError::Internal(_) => json!({"error": "An internal error occurred"}),
      AppError::Booking { source } if status.is_server_error() => match source {
        BookingError::Storage { .. } => json!({"error": "Database operation failed"}),
        BookingError::CheckoutCreationFailed { .. } => {
          json!({"error": "Payment provider is unavailable, please try again"})
        }
        _ => json!({"error": "An internal error occurred"}),
      },
      other => json!({"error": other.to_string()}),
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
