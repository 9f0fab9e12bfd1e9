// studio_booking/src/capacity.rs

//! Capacity Guard. Pure decisions only; the stores call these inside their
//! own atomic units so the count and the write cannot drift apart.

use chrono::{DateTime, Utc};

use crate::error::{BookingError, NotBookableReason};
use crate::model::{BookingStatus, PaymentEventKind, RefundReason, Session};

/// Open for new bookings: active and not yet started.
pub fn check_bookable(session: &Session, now: DateTime<Utc>) -> Result<(), BookingError> {
  if !session.active {
    return Err(BookingError::SessionNotBookable {
      session_id: session.id,
      reason: NotBookableReason::Inactive,
    });
  }
  if session.has_started(now) {
    return Err(BookingError::SessionNotBookable {
      session_id: session.id,
      reason: NotBookableReason::AlreadyStarted,
    });
  }
  Ok(())
}

/// Optimistic intake check. Two concurrent callers can both pass it.
pub fn can_admit_at_intake(session: &Session, paid_count: i64, now: DateTime<Utc>) -> Result<(), BookingError> {
  check_bookable(session, now)?;
  if !can_confirm(session.capacity, paid_count) {
    return Err(BookingError::SessionFull { session_id: session.id });
  }
  Ok(())
}

/// Authoritative check. Only meaningful when `paid_count` was read inside the
/// same atomic unit that flips the booking to `paid`.
pub fn can_confirm(capacity: Option<i32>, paid_count: i64) -> bool {
  match capacity {
    None => true,
    Some(capacity) => paid_count < i64::from(capacity),
  }
}

/// Seats left for display. `None` means unlimited.
pub fn remaining(capacity: Option<i32>, paid_count: i64) -> Option<i64> {
  capacity.map(|capacity| (i64::from(capacity) - paid_count).max(0))
}

/// What a store must do with a payment event, given the booking's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentPlan {
  /// Forward transition. `confirm` sets the payment handle and confirmation time.
  Advance { to: BookingStatus, confirm: bool },
  /// Paid, but the last seat went to someone else.
  LoseRace,
  /// Leave the booking as it is, optionally queueing a refund review.
  Hold { review: Option<RefundReason> },
}

/// Whether `plan_payment` needs a fresh paid count for this combination.
pub fn requires_seat(kind: PaymentEventKind, current: BookingStatus) -> bool {
  kind == PaymentEventKind::PaymentSucceeded && current == BookingStatus::Pending
}

pub fn plan_payment(kind: PaymentEventKind, current: BookingStatus, seat_available: bool) -> PaymentPlan {
  use BookingStatus::*;
  use PaymentEventKind::*;

  match (kind, current) {
    (PaymentSucceeded, Pending) if seat_available => PaymentPlan::Advance { to: Paid, confirm: true },
    (PaymentSucceeded, Pending) => PaymentPlan::LoseRace,
    (PaymentSucceeded, Cancelled | Expired) => PaymentPlan::Hold {
      review: Some(RefundReason::BookingNoLongerHeld),
    },
    (PaymentFailed, Pending) => PaymentPlan::Advance { to: Cancelled, confirm: false },
    (PaymentExpired, Pending) => PaymentPlan::Advance { to: Expired, confirm: false },
    (PaymentRefunded, Paid) => PaymentPlan::Advance { to: Refunded, confirm: false },
    _ => PaymentPlan::Hold { review: None },
  }
}
