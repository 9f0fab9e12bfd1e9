// studio_booking/src/store/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::{refund_review, BookingStore, PaymentApplication, PaymentEventCommand, TransitionEffect, TransitionOutcome};
use crate::capacity::{can_confirm, plan_payment, requires_seat, PaymentPlan};
use crate::error::{BookingError, BookingResult};
use crate::model::{Booking, BookingStatus, PaymentEventRecord, RefundReason, RefundReview, Session};
use crate::token::tokens_match;

#[derive(Debug, Default)]
struct Tables {
  sessions: HashMap<Uuid, Session>,
  bookings: HashMap<Uuid, Booking>,
  events: HashMap<String, PaymentEventRecord>,
  reviews: Vec<RefundReview>,
}

impl Tables {
  fn paid_count(&self, session_id: Uuid) -> i64 {
    self
      .bookings
      .values()
      .filter(|b| b.session_id == session_id && b.status == BookingStatus::Paid)
      .count() as i64
  }

  fn has_review(&self, booking_id: Uuid) -> bool {
    self.reviews.iter().any(|r| r.booking_id == booking_id)
  }
}

/// In-process store. A single mutex makes every trait method one atomic
/// unit; the lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of recorded payment events, for tests and diagnostics.
  pub fn payment_event_count(&self) -> usize {
    self.tables.lock().events.len()
  }

  pub fn booking_count(&self) -> usize {
    self.tables.lock().bookings.len()
  }
}

#[async_trait]
impl BookingStore for MemoryStore {
  async fn insert_session(&self, session: &Session) -> BookingResult<()> {
    session.validate()?;
    self.tables.lock().sessions.insert(session.id, session.clone());
    Ok(())
  }

  async fn get_session(&self, session_id: Uuid) -> BookingResult<Option<Session>> {
    Ok(self.tables.lock().sessions.get(&session_id).cloned())
  }

  async fn list_upcoming_sessions(&self, now: DateTime<Utc>) -> BookingResult<Vec<(Session, i64)>> {
    let tables = self.tables.lock();
    let mut upcoming: Vec<(Session, i64)> = tables
      .sessions
      .values()
      .filter(|s| s.active && s.starts_at > now)
      .map(|s| (s.clone(), tables.paid_count(s.id)))
      .collect();
    upcoming.sort_by_key(|(s, _)| s.starts_at);
    Ok(upcoming)
  }

  async fn count_paid(&self, session_id: Uuid) -> BookingResult<i64> {
    Ok(self.tables.lock().paid_count(session_id))
  }

  async fn insert_booking(&self, booking: &Booking) -> BookingResult<()> {
    let mut tables = self.tables.lock();
    if !tables.sessions.contains_key(&booking.session_id) {
      return Err(BookingError::SessionNotFound {
        session_id: booking.session_id,
      });
    }
    if tables.bookings.contains_key(&booking.id)
      || tables.bookings.values().any(|b| b.manage_token == booking.manage_token)
    {
      return Err(BookingError::storage(anyhow::anyhow!(
        "booking {} violates a uniqueness constraint",
        booking.id
      )));
    }
    tables.bookings.insert(booking.id, booking.clone());
    Ok(())
  }

  async fn void_booking(&self, booking_id: Uuid) -> BookingResult<bool> {
    let mut tables = self.tables.lock();
    let voidable = tables
      .bookings
      .get(&booking_id)
      .is_some_and(|b| b.status == BookingStatus::Pending && b.checkout_handle.is_none());
    if voidable {
      tables.bookings.remove(&booking_id);
    }
    Ok(voidable)
  }

  async fn attach_checkout_handle(&self, booking_id: Uuid, handle: &str) -> BookingResult<()> {
    let mut tables = self.tables.lock();
    let booking = tables.bookings.get_mut(&booking_id).ok_or(BookingError::BookingNotFound)?;
    booking.checkout_handle = Some(handle.to_string());
    Ok(())
  }

  async fn get_booking(&self, booking_id: Uuid) -> BookingResult<Option<Booking>> {
    Ok(self.tables.lock().bookings.get(&booking_id).cloned())
  }

  async fn find_by_manage_token(&self, token: &str) -> BookingResult<Option<Booking>> {
    let tables = self.tables.lock();
    // Compare against every row so the scan time does not depend on where a match sits.
    let mut found = None;
    for booking in tables.bookings.values() {
      if tokens_match(&booking.manage_token, token) && found.is_none() {
        found = Some(booking.clone());
      }
    }
    Ok(found)
  }

  async fn find_by_checkout_handle(&self, handle: &str) -> BookingResult<Option<Booking>> {
    Ok(
      self
        .tables
        .lock()
        .bookings
        .values()
        .find(|b| b.checkout_handle.as_deref() == Some(handle))
        .cloned(),
    )
  }

  async fn find_by_payment_handle(&self, handle: &str) -> BookingResult<Option<Booking>> {
    Ok(
      self
        .tables
        .lock()
        .bookings
        .values()
        .find(|b| b.payment_handle.as_deref() == Some(handle))
        .cloned(),
    )
  }

  async fn transition(
    &self,
    booking_id: Uuid,
    from: &[BookingStatus],
    to: BookingStatus,
    effect: TransitionEffect,
  ) -> BookingResult<TransitionOutcome> {
    let mut tables = self.tables.lock();
    let booking = tables.bookings.get_mut(&booking_id).ok_or(BookingError::BookingNotFound)?;
    let current = booking.status;
    if !from.contains(&current) {
      return Ok(TransitionOutcome::Unchanged { current });
    }
    booking.status = to;
    if let Some(handle) = effect.payment_handle {
      booking.payment_handle = Some(handle);
    }
    if let Some(confirmed_at) = effect.confirmed_at {
      booking.confirmed_at = Some(confirmed_at);
    }
    Ok(TransitionOutcome::Applied { from: current, to })
  }

  async fn has_payment_event(&self, event_id: &str) -> BookingResult<bool> {
    Ok(self.tables.lock().events.contains_key(event_id))
  }

  async fn apply_payment_event(&self, command: &PaymentEventCommand) -> BookingResult<PaymentApplication> {
    let mut tables = self.tables.lock();
    if tables.events.contains_key(&command.event_id) {
      return Ok(PaymentApplication::Duplicate);
    }

    let booking = tables
      .bookings
      .get(&command.booking_id)
      .cloned()
      .ok_or(BookingError::BookingNotFound)?;
    let current = booking.status;

    let seat_available = if requires_seat(command.kind, current) {
      let capacity = tables
        .sessions
        .get(&booking.session_id)
        .ok_or(BookingError::SessionNotFound {
          session_id: booking.session_id,
        })?
        .capacity;
      can_confirm(capacity, tables.paid_count(booking.session_id))
    } else {
      true
    };

    let (applied_status, application) = match plan_payment(command.kind, current, seat_available) {
      PaymentPlan::Advance { to, confirm } => {
        if let Some(row) = tables.bookings.get_mut(&booking.id) {
          row.status = to;
          if confirm {
            row.confirmed_at = Some(command.received_at);
            if command.payment_handle.is_some() {
              row.payment_handle = command.payment_handle.clone();
            }
          }
        }
        (to, PaymentApplication::Applied { from: current, to })
      }
      PaymentPlan::LoseRace => {
        if let Some(row) = tables.bookings.get_mut(&booking.id) {
          row.status = BookingStatus::Cancelled;
          if command.payment_handle.is_some() {
            row.payment_handle = command.payment_handle.clone();
          }
        }
        let review = refund_review(&booking, command, RefundReason::CapacityExhausted);
        tables.reviews.push(review.clone());
        (BookingStatus::Cancelled, PaymentApplication::CapacityLost { review })
      }
      PaymentPlan::Hold { review } => {
        let review = review
          .filter(|_| !tables.has_review(booking.id))
          .map(|reason| refund_review(&booking, command, reason));
        if let Some(review) = &review {
          tables.reviews.push(review.clone());
        }
        (current, PaymentApplication::Unchanged { current, review })
      }
    };

    tables.events.insert(
      command.event_id.clone(),
      PaymentEventRecord {
        event_id: command.event_id.clone(),
        booking_id: booking.id,
        kind: command.kind,
        applied_status,
        amount_observed: command.amount,
        currency_observed: command.currency.clone(),
        processed_at: command.received_at,
      },
    );
    Ok(application)
  }

  async fn payment_events_for_booking(&self, booking_id: Uuid) -> BookingResult<Vec<PaymentEventRecord>> {
    let tables = self.tables.lock();
    let mut records: Vec<PaymentEventRecord> =
      tables.events.values().filter(|e| e.booking_id == booking_id).cloned().collect();
    records.sort_by_key(|e| e.processed_at);
    Ok(records)
  }

  async fn list_for_owner(&self, owner_id: Uuid) -> BookingResult<Vec<Booking>> {
    let tables = self.tables.lock();
    let mut owned: Vec<Booking> = tables
      .bookings
      .values()
      .filter(|b| b.owner_id == Some(owner_id))
      .cloned()
      .collect();
    owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(owned)
  }

  async fn claim_by_email(&self, owner_id: Uuid, email: &str) -> BookingResult<Vec<Uuid>> {
    let email = email.trim().to_lowercase();
    let mut tables = self.tables.lock();
    let mut claimed = Vec::new();
    for booking in tables.bookings.values_mut() {
      if booking.owner_id.is_none() && booking.contact_email.to_lowercase() == email {
        booking.owner_id = Some(owner_id);
        claimed.push(booking.id);
      }
    }
    Ok(claimed)
  }

  async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> BookingResult<Vec<Uuid>> {
    Ok(
      self
        .tables
        .lock()
        .bookings
        .values()
        .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
        .map(|b| b.id)
        .collect(),
    )
  }

  async fn list_refund_reviews(&self) -> BookingResult<Vec<RefundReview>> {
    Ok(self.tables.lock().reviews.clone())
  }
}
