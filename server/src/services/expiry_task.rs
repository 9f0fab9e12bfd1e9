// studio_booking_server/src/services/expiry_task.rs

use chrono::Utc;
use std::time::Duration;
use studio_booking::PendingSweeper;
use tokio::task::JoinHandle;
use tracing::{event, Level};

/// Runs the pending-expiry sweep every `interval` until the runtime shuts down.
/// A failed sweep is logged and retried on the next tick.
pub fn spawn(sweeper: PendingSweeper, interval: Duration) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    event!(Level::INFO, interval_secs = interval.as_secs(), hold_minutes = sweeper.hold().num_minutes(), "Pending expiry sweeper started.");
    loop {
      ticker.tick().await;
      match sweeper.sweep(Utc::now()).await {
        Ok(report) if report.expired > 0 => {
          event!(Level::INFO, expired = report.expired, skipped = report.skipped, "Expired stale pending bookings.");
        }
        Ok(_) => {}
        Err(e) => event!(Level::ERROR, error = %e, "Pending expiry sweep failed."),
      }
    }
  })
}
