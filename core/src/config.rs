// studio_booking/src/config.rs

use std::time::Duration;

use crate::error::BookingError;

/// Shortest hold accepted. Hosted checkouts stay payable at least this long,
/// so a shorter local hold would expire bookings customers can still pay for.
pub const MIN_PENDING_HOLD_MINUTES: i64 = 31;

/// Settings the booking core needs from its host application.
#[derive(Debug, Clone)]
pub struct BookingConfig {
  /// Where the processor sends the customer after paying. May contain the
  /// processor's `{CHECKOUT_SESSION_ID}` placeholder.
  pub success_url: String,
  pub cancel_url: String,
  /// Upper bound on a single call to the payment processor.
  pub processor_timeout: Duration,
  /// Maximum age of a webhook signature timestamp.
  pub signature_tolerance: Duration,
  /// How long an unpaid booking may stay pending. `None` disables expiry.
  pub pending_hold: Option<chrono::Duration>,
}

impl BookingConfig {
  pub fn for_site(site_url: &str) -> Self {
    let site = site_url.trim_end_matches('/');
    Self {
      success_url: format!("{}/booking/success?session_id={{CHECKOUT_SESSION_ID}}", site),
      cancel_url: format!("{}/booking/cancelled", site),
      ..Self::default()
    }
  }

  pub fn with_pending_hold(mut self, hold: chrono::Duration) -> Self {
    self.pending_hold = Some(hold);
    self
  }

  pub fn validate(&self) -> Result<(), BookingError> {
    if self.success_url.is_empty() || self.cancel_url.is_empty() {
      return Err(BookingError::Config("success and cancel URLs are required".to_string()));
    }
    if self.processor_timeout.is_zero() {
      return Err(BookingError::Config("processor timeout must be positive".to_string()));
    }
    if let Some(hold) = self.pending_hold {
      check_pending_hold(hold)?;
    }
    Ok(())
  }
}

pub(crate) fn check_pending_hold(hold: chrono::Duration) -> Result<(), BookingError> {
  if hold < chrono::Duration::minutes(MIN_PENDING_HOLD_MINUTES) {
    return Err(BookingError::Config(format!(
      "pending hold must be at least {} minutes",
      MIN_PENDING_HOLD_MINUTES
    )));
  }
  Ok(())
}

impl Default for BookingConfig {
  fn default() -> Self {
    Self {
      success_url: "http://localhost:3000/booking/success?session_id={CHECKOUT_SESSION_ID}".to_string(),
      cancel_url: "http://localhost:3000/booking/cancelled".to_string(),
      processor_timeout: Duration::from_secs(10),
      signature_tolerance: Duration::from_secs(300),
      pending_hold: None,
    }
  }
}
