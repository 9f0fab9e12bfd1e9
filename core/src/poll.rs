// studio_booking/src/poll.rs

//! Bounded status polling for the checkout success page. A convenience over
//! webhook confirmation; it never writes anything.

use serde::Serialize;
use std::time::Duration;
use tracing::{event, instrument, Level};
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};
use crate::ledger::BookingLedger;
use crate::model::BookingStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
  pub max_attempts: u32,
  pub interval: Duration,
  /// Multiplier applied to the interval after each attempt. `1.0` keeps it fixed.
  pub backoff_factor: f64,
}

impl Default for PollPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 10,
      interval: Duration::from_secs(2),
      backoff_factor: 1.0,
    }
  }
}

impl PollPolicy {
  pub fn single() -> Self {
    Self {
      max_attempts: 1,
      interval: Duration::ZERO,
      backoff_factor: 1.0,
    }
  }

  /// Delay before attempt `attempt + 1`, counting from zero.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    let factor = self.backoff_factor.max(1.0).powi(attempt as i32);
    self.interval.mul_f64(factor)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
  pub booking_id: Uuid,
  pub status: BookingStatus,
  pub attempts: u32,
  /// False when attempts ran out while the booking was still pending.
  pub settled: bool,
}

#[derive(Clone)]
pub struct ConfirmationPoller {
  ledger: BookingLedger,
  policy: PollPolicy,
}

impl ConfirmationPoller {
  pub fn new(ledger: BookingLedger, policy: PollPolicy) -> Self {
    Self { ledger, policy }
  }

  pub fn policy(&self) -> PollPolicy {
    self.policy
  }

  /// Reads the booking behind a checkout handle until it leaves `pending` or
  /// attempts run out. An unknown handle is retried too, since it may not be
  /// persisted yet.
  #[instrument(skip(self))]
  pub async fn poll(&self, checkout_handle: &str) -> BookingResult<PollResult> {
    let attempts = self.policy.max_attempts.max(1);
    let mut last = None;

    for attempt in 0..attempts {
      match self.ledger.get_by_checkout_handle(checkout_handle).await {
        Ok(booking) if booking.status != BookingStatus::Pending => {
          return Ok(PollResult {
            booking_id: booking.id,
            status: booking.status,
            attempts: attempt + 1,
            settled: true,
          });
        }
        Ok(booking) => last = Some(booking),
        Err(BookingError::BookingNotFound) => {}
        Err(e) => return Err(e),
      }

      if attempt + 1 < attempts {
        let delay = self.policy.delay_after(attempt);
        event!(Level::TRACE, attempt, ?delay, "Booking still pending, polling again.");
        tokio::time::sleep(delay).await;
      }
    }

    let booking = last.ok_or(BookingError::BookingNotFound)?;
    Ok(PollResult {
      booking_id: booking.id,
      status: booking.status,
      attempts,
      settled: false,
    })
  }
}
