// studio_booking/src/store/mod.rs

//! The storage seam. Every method is one atomic unit in the backing store;
//! concurrency correctness of the whole core rests on that.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::BookingResult;
use crate::model::{Booking, BookingStatus, PaymentEventKind, PaymentEventRecord, RefundReason, RefundReview, Session};

pub use memory::MemoryStore;

/// Side-channel fields written together with a status change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionEffect {
  pub payment_handle: Option<String>,
  pub confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
  Applied { from: BookingStatus, to: BookingStatus },
  /// The booking was not in any of the allowed source states.
  Unchanged { current: BookingStatus },
}

impl TransitionOutcome {
  pub fn is_applied(&self) -> bool {
    matches!(self, TransitionOutcome::Applied { .. })
  }
}

/// A verified, classified payment notification ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEventCommand {
  pub event_id: String,
  pub booking_id: Uuid,
  pub kind: PaymentEventKind,
  pub payment_handle: Option<String>,
  pub amount: Option<i64>,
  pub currency: Option<String>,
  pub received_at: DateTime<Utc>,
}

/// Result of applying one payment event in a single atomic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentApplication {
  /// The event id was already recorded; nothing was touched.
  Duplicate,
  Applied { from: BookingStatus, to: BookingStatus },
  /// Payment succeeded but the session was full. The booking was cancelled
  /// and a refund review queued.
  CapacityLost { review: RefundReview },
  /// Wrong source state. The event is recorded, the booking is untouched.
  Unchanged {
    current: BookingStatus,
    review: Option<RefundReview>,
  },
}

/// Builds the review row for a payment that landed on a booking that does not hold a seat.
/// Amount and currency fall back to what the booking captured.
pub fn refund_review(booking: &Booking, command: &PaymentEventCommand, reason: RefundReason) -> RefundReview {
  RefundReview {
    booking_id: booking.id,
    event_id: command.event_id.clone(),
    amount: command.amount.unwrap_or(booking.amount),
    currency: command.currency.clone().unwrap_or_else(|| booking.currency.clone()),
    reason,
    created_at: command.received_at,
  }
}

#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
  async fn insert_session(&self, session: &Session) -> BookingResult<()>;

  async fn get_session(&self, session_id: Uuid) -> BookingResult<Option<Session>>;

  /// Active sessions starting after `now`, ordered by start, each with its paid count.
  async fn list_upcoming_sessions(&self, now: DateTime<Utc>) -> BookingResult<Vec<(Session, i64)>>;

  async fn count_paid(&self, session_id: Uuid) -> BookingResult<i64>;

  async fn insert_booking(&self, booking: &Booking) -> BookingResult<()>;

  /// Deletes a booking that is still pending and has no checkout handle.
  /// Returns whether a row was removed.
  async fn void_booking(&self, booking_id: Uuid) -> BookingResult<bool>;

  async fn attach_checkout_handle(&self, booking_id: Uuid, handle: &str) -> BookingResult<()>;

  async fn get_booking(&self, booking_id: Uuid) -> BookingResult<Option<Booking>>;

  async fn find_by_manage_token(&self, token: &str) -> BookingResult<Option<Booking>>;

  async fn find_by_checkout_handle(&self, handle: &str) -> BookingResult<Option<Booking>>;

  async fn find_by_payment_handle(&self, handle: &str) -> BookingResult<Option<Booking>>;

  /// Conditional update keyed on the current status. Fails with
  /// `BookingNotFound` only when the booking does not exist.
  async fn transition(
    &self,
    booking_id: Uuid,
    from: &[BookingStatus],
    to: BookingStatus,
    effect: TransitionEffect,
  ) -> BookingResult<TransitionOutcome>;

  async fn has_payment_event(&self, event_id: &str) -> BookingResult<bool>;

  /// De-duplicates, re-checks capacity, transitions the booking, records the
  /// event and queues any refund review, all in one atomic unit.
  async fn apply_payment_event(&self, command: &PaymentEventCommand) -> BookingResult<PaymentApplication>;

  async fn payment_events_for_booking(&self, booking_id: Uuid) -> BookingResult<Vec<PaymentEventRecord>>;

  /// Newest first.
  async fn list_for_owner(&self, owner_id: Uuid) -> BookingResult<Vec<Booking>>;

  /// Sets `owner_id` on every unowned booking whose contact email matches
  /// case-insensitively. Returns the ids claimed by this call.
  async fn claim_by_email(&self, owner_id: Uuid, email: &str) -> BookingResult<Vec<Uuid>>;

  async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> BookingResult<Vec<Uuid>>;

  async fn list_refund_reviews(&self) -> BookingResult<Vec<RefundReview>>;
}
