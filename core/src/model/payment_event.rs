// studio_booking/src/model/payment_event.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::BookingStatus;
use crate::error::BookingError;

/// What a payment notification means for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
  PaymentSucceeded,
  PaymentFailed,
  PaymentRefunded,
  /// The hosted checkout page expired before the customer paid.
  PaymentExpired,
}

impl PaymentEventKind {
  pub const ALL: [PaymentEventKind; 4] = [
    PaymentEventKind::PaymentSucceeded,
    PaymentEventKind::PaymentFailed,
    PaymentEventKind::PaymentRefunded,
    PaymentEventKind::PaymentExpired,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      PaymentEventKind::PaymentSucceeded => "payment_succeeded",
      PaymentEventKind::PaymentFailed => "payment_failed",
      PaymentEventKind::PaymentRefunded => "payment_refunded",
      PaymentEventKind::PaymentExpired => "payment_expired",
    }
  }
}

impl fmt::Display for PaymentEventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentEventKind {
  type Err = BookingError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    PaymentEventKind::ALL
      .into_iter()
      .find(|kind| kind.as_str() == s)
      .ok_or_else(|| BookingError::storage(anyhow::anyhow!("unknown payment event kind '{}'", s)))
  }
}

/// De-duplication ledger entry. `event_id` is the idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEventRecord {
  pub event_id: String,
  pub booking_id: Uuid,
  pub kind: PaymentEventKind,
  /// Booking status once the event was handled (unchanged for no-ops).
  pub applied_status: BookingStatus,
  pub amount_observed: Option<i64>,
  pub currency_observed: Option<String>,
  pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
  /// Payment landed after the session filled up; the booking was auto-cancelled.
  CapacityExhausted,
  /// Payment landed for a booking that was already cancelled or expired.
  BookingNoLongerHeld,
}

impl RefundReason {
  pub fn as_str(self) -> &'static str {
    match self {
      RefundReason::CapacityExhausted => "capacity_exhausted",
      RefundReason::BookingNoLongerHeld => "booking_no_longer_held",
    }
  }
}

impl FromStr for RefundReason {
  type Err = BookingError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    [RefundReason::CapacityExhausted, RefundReason::BookingNoLongerHeld]
      .into_iter()
      .find(|reason| reason.as_str() == s)
      .ok_or_else(|| BookingError::storage(anyhow::anyhow!("unknown refund reason '{}'", s)))
  }
}

/// A customer paid for a slot they do not hold. Needs a human to refund or contact them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReview {
  pub booking_id: Uuid,
  pub event_id: String,
  pub amount: i64,
  pub currency: String,
  pub reason: RefundReason,
  pub created_at: DateTime<Utc>,
}
