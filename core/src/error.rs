// studio_booking/src/error.rs
use anyhow::Error as AnyhowError;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::model::BookingStatus;

/// Why a session refused a new booking attempt at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotBookableReason {
  Inactive,
  AlreadyStarted,
}

impl fmt::Display for NotBookableReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NotBookableReason::Inactive => f.write_str("session is not open for booking"),
      NotBookableReason::AlreadyStarted => f.write_str("session has already started"),
    }
  }
}

/// Errors raised by the step-flow engine itself, independent of the domain.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for non-optional step '{step}' in flow '{flow}'")]
  HandlerMissing { flow: String, step: String },
}

/// Failures talking to the external payment processor.
#[derive(Debug, Error)]
pub enum ProcessorError {
  #[error("Payment processor did not answer within {0:?}")]
  Timeout(std::time::Duration),

  #[error("Payment processor rejected the request (status {status}): {body}")]
  Rejected { status: u16, body: String },

  #[error("Payment processor transport failure: {0}")]
  Transport(String),

  #[error("Payment processor returned an unusable response: {0}")]
  InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum BookingError {
  #[error("Session not found: {session_id}")]
  SessionNotFound { session_id: Uuid },

  #[error("Session {session_id} is not bookable: {reason}")]
  SessionNotBookable { session_id: Uuid, reason: NotBookableReason },

  #[error("Session {session_id} is fully booked")]
  SessionFull { session_id: Uuid },

  #[error("Invalid contact details: {0}")]
  InvalidContact(String),

  #[error("Session {session_id} has no valid price")]
  NoPrice { session_id: Uuid },

  #[error("Failed to create payment checkout. Source: {source}")]
  CheckoutCreationFailed {
    #[source]
    source: ProcessorError,
  },

  #[error("Booking not found")]
  BookingNotFound,

  #[error("Illegal booking transition from '{from}' to '{to}'")]
  IllegalTransition { from: BookingStatus, to: BookingStatus },

  #[error("Paid bookings can only be cancelled by the studio after review")]
  CancellationRequiresReview,

  #[error("Booking does not belong to the requesting account")]
  NotOwner,

  #[error("Webhook signature verification failed: {0}")]
  InvalidSignature(String),

  #[error("Malformed payment event: {0}")]
  MalformedEvent(String),

  #[error("Invalid session definition: {0}")]
  InvalidSession(String),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Flow error: {source}")]
  Flow {
    #[from]
    source: FlowError,
  },

  #[error("Storage error. Source: {source}")]
  Storage {
    #[source]
    source: AnyhowError,
  },
}

impl BookingError {
  /// Wraps any storage-layer failure.
  pub fn storage(err: impl Into<AnyhowError>) -> Self {
    BookingError::Storage { source: err.into() }
  }

  /// True when a retry of the same request could plausibly succeed.
  pub fn is_transient(&self) -> bool {
    matches!(self, BookingError::Storage { .. })
  }
}

// Storage adapters mostly work with anyhow internally; everything that reaches
// the core through `?` on an anyhow result is treated as a storage failure.
impl From<AnyhowError> for BookingError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<BookingError>() {
      Ok(booking_err) => booking_err,
      Err(err) => BookingError::Storage { source: err },
    }
  }
}

pub type BookingResult<T, E = BookingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn anyhow_wrapping_a_booking_error_is_unwrapped() {
    let wrapped = anyhow::Error::new(BookingError::BookingNotFound);
    assert!(matches!(BookingError::from(wrapped), BookingError::BookingNotFound));
  }

  #[test]
  fn plain_anyhow_becomes_transient_storage_error() {
    let err = BookingError::from(anyhow::anyhow!("connection reset"));
    assert!(err.is_transient());
    assert!(!BookingError::NotOwner.is_transient());
  }
}
