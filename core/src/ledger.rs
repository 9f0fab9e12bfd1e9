// studio_booking/src/ledger.rs

//! Booking Ledger: the durable record of booking attempts and every status
//! change they go through.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{event, instrument, Level};
use uuid::Uuid;

use crate::capacity::check_bookable;
use crate::error::{BookingError, BookingResult};
use crate::model::{Booking, BookingStatus, Contact, Session};
use crate::store::{BookingStore, TransitionEffect, TransitionOutcome};
use crate::token::{is_well_formed, issue_token};

#[derive(Clone)]
pub struct BookingLedger {
  store: Arc<dyn BookingStore>,
}

impl BookingLedger {
  pub fn new(store: Arc<dyn BookingStore>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &Arc<dyn BookingStore> {
    &self.store
  }

  /// Creates a `pending` booking. Price and currency are copied from the
  /// snapshot and never re-read.
  #[instrument(skip(self, session, contact), fields(session_id = %session.id))]
  pub async fn create(
    &self,
    session: &Session,
    contact: Contact,
    owner_id: Option<Uuid>,
    now: DateTime<Utc>,
  ) -> BookingResult<Booking> {
    check_bookable(session, now)?;

    let booking = Booking {
      id: Uuid::new_v4(),
      session_id: session.id,
      owner_id,
      contact_name: contact.name,
      contact_email: contact.email,
      contact_phone: contact.phone,
      status: BookingStatus::Pending,
      amount: session.price,
      currency: session.currency.clone(),
      checkout_handle: None,
      payment_handle: None,
      manage_token: issue_token(),
      created_at: now,
      confirmed_at: None,
    };
    self.store.insert_booking(&booking).await?;
    event!(Level::INFO, booking_id = %booking.id, guest = booking.is_guest(), "Pending booking created.");
    Ok(booking)
  }

  pub async fn get_by_id(&self, booking_id: Uuid) -> BookingResult<Booking> {
    self.store.get_booking(booking_id).await?.ok_or(BookingError::BookingNotFound)
  }

  /// Unknown and malformed tokens look the same to the caller.
  pub async fn get_by_management_token(&self, token: &str) -> BookingResult<Booking> {
    if !is_well_formed(token) {
      return Err(BookingError::BookingNotFound);
    }
    self.store.find_by_manage_token(token).await?.ok_or(BookingError::BookingNotFound)
  }

  pub async fn get_by_checkout_handle(&self, handle: &str) -> BookingResult<Booking> {
    self
      .store
      .find_by_checkout_handle(handle)
      .await?
      .ok_or(BookingError::BookingNotFound)
  }

  pub async fn attach_checkout_handle(&self, booking_id: Uuid, handle: &str) -> BookingResult<()> {
    self.store.attach_checkout_handle(booking_id, handle).await
  }

  /// Removes a pending booking whose checkout was never issued.
  pub async fn void(&self, booking_id: Uuid) -> BookingResult<bool> {
    let removed = self.store.void_booking(booking_id).await?;
    event!(Level::DEBUG, %booking_id, removed, "Voided pending booking.");
    Ok(removed)
  }

  /// Guarded status change. A booking outside `from` yields `Unchanged`,
  /// which is how duplicate and out-of-order callers stay harmless.
  ///
  /// Never confirms: `paid` is only reached through the store's
  /// `apply_payment_event`, which counts capacity in the same atomic unit.
  #[instrument(skip(self, effect))]
  pub async fn transition(
    &self,
    booking_id: Uuid,
    from: &[BookingStatus],
    to: BookingStatus,
    effect: TransitionEffect,
  ) -> BookingResult<TransitionOutcome> {
    if to == BookingStatus::Paid {
      let from = from.first().copied().unwrap_or(BookingStatus::Pending);
      return Err(BookingError::IllegalTransition { from, to });
    }
    if let Some(bad) = from.iter().find(|status| !status.can_transition_to(to)) {
      return Err(BookingError::IllegalTransition { from: *bad, to });
    }
    let outcome = self.store.transition(booking_id, from, to, effect).await?;
    match outcome {
      TransitionOutcome::Applied { from, to } => {
        event!(Level::INFO, from = %from, to = %to, "Booking transitioned.");
      }
      TransitionOutcome::Unchanged { current } => {
        event!(Level::DEBUG, current = %current, "Transition not applicable, booking unchanged.");
      }
    }
    Ok(outcome)
  }

  pub async fn cancel_if_pending(&self, booking_id: Uuid) -> BookingResult<TransitionOutcome> {
    self
      .transition(
        booking_id,
        &[BookingStatus::Pending],
        BookingStatus::Cancelled,
        TransitionEffect::default(),
      )
      .await
  }

  pub async fn expire_if_pending(&self, booking_id: Uuid) -> BookingResult<TransitionOutcome> {
    self
      .transition(
        booking_id,
        &[BookingStatus::Pending],
        BookingStatus::Expired,
        TransitionEffect::default(),
      )
      .await
  }

  pub async fn list_for_owner(&self, owner_id: Uuid) -> BookingResult<Vec<Booking>> {
    self.store.list_for_owner(owner_id).await
  }

  pub async fn claim_by_email(&self, owner_id: Uuid, email: &str) -> BookingResult<Vec<Uuid>> {
    self.store.claim_by_email(owner_id, email).await
  }
}
