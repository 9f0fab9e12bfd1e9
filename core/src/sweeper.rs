// studio_booking/src/sweeper.rs

//! Releases bookings left pending longer than the hold window. Just another
//! caller of the ledger's guarded `pending -> expired` transition.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{event, instrument, Level};

use crate::config::check_pending_hold;
use crate::error::{BookingError, BookingResult};
use crate::ledger::BookingLedger;
use crate::store::TransitionOutcome;

/// Slack past the hold for the processor's own session expiry, which is
/// stamped a moment after the booking row is created.
pub const EXPIRY_GRACE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub expired: usize,
  /// Bookings that settled between listing and expiring.
  pub skipped: usize,
}

#[derive(Clone)]
pub struct PendingSweeper {
  ledger: BookingLedger,
  hold: Duration,
}

impl PendingSweeper {
  pub fn new(ledger: BookingLedger, hold: Duration) -> BookingResult<Self> {
    check_pending_hold(hold)?;
    Ok(Self { ledger, hold })
  }

  pub fn hold(&self) -> Duration {
    self.hold
  }

  #[instrument(skip(self))]
  pub async fn sweep(&self, now: DateTime<Utc>) -> BookingResult<SweepReport> {
    let cutoff = now - self.hold - Duration::minutes(EXPIRY_GRACE_MINUTES);
    let mut report = SweepReport::default();
    for booking_id in self.ledger.store().list_pending_created_before(cutoff).await? {
      match self.ledger.expire_if_pending(booking_id).await {
        Ok(TransitionOutcome::Applied { .. }) => report.expired += 1,
        Ok(TransitionOutcome::Unchanged { .. }) | Err(BookingError::BookingNotFound) => report.skipped += 1,
        Err(e) => return Err(e),
      }
    }
    if report.expired > 0 {
      event!(Level::INFO, expired = report.expired, skipped = report.skipped, "Expired stale pending bookings.");
    }
    Ok(report)
  }
}
