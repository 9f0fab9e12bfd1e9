// studio_booking/src/model/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BookingError;

/// A bookable, pre-defined time slot. Edited by administrators outside the
/// core; the core only ever reads snapshots of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub id: Uuid,
  pub title: String,
  pub description: Option<String>,
  pub location: Option<String>,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
  /// Price in minor currency units.
  pub price: i64,
  pub currency: String,
  /// `None` means unlimited.
  pub capacity: Option<i32>,
  pub active: bool,
  pub created_at: DateTime<Utc>,
}

impl Session {
  pub fn validate(&self) -> Result<(), BookingError> {
    if self.ends_at <= self.starts_at {
      return Err(BookingError::InvalidSession(format!(
        "session {} ends before it starts",
        self.id
      )));
    }
    if matches!(self.capacity, Some(c) if c < 0) {
      return Err(BookingError::InvalidSession(format!(
        "session {} has a negative capacity",
        self.id
      )));
    }
    Ok(())
  }

  pub fn has_started(&self, now: DateTime<Utc>) -> bool {
    now >= self.starts_at
  }

  /// Human-readable time window, e.g. `2026-10-20 at 18:00–19:15`.
  pub fn time_window_label(&self) -> String {
    let same_day = self.starts_at.date_naive() == self.ends_at.date_naive();
    let end_format = if same_day { "%H:%M" } else { "%Y-%m-%d %H:%M" };
    format!(
      "{} at {}–{}",
      self.starts_at.format("%Y-%m-%d"),
      self.starts_at.format("%H:%M"),
      self.ends_at.format(end_format)
    )
  }

  /// Description shown on the processor's hosted checkout page.
  pub fn checkout_description(&self) -> String {
    match self.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
      Some(location) => format!("{} - {}", self.time_window_label(), location),
      None => self.time_window_label(),
    }
  }
}
