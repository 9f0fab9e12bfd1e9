// studio_booking/src/access.rs

//! Access Token Service: guest self-service through the management token,
//! plus the claim-by-email merge of guest bookings into an account.
//!
//! Claiming trusts whoever controls the inbox. It only ever adds an owner to
//! unowned rows, so a wrong claim can be reverted without losing data.

use serde::Serialize;
use tracing::{event, instrument, Level};
use uuid::Uuid;

use crate::catalog::SessionCatalog;
use crate::error::{BookingError, BookingResult};
use crate::ledger::BookingLedger;
use crate::model::{Booking, BookingStatus, Session};
use crate::store::TransitionOutcome;
use crate::token;

/// What the self-service view offers for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManageAction {
  Cancel,
  /// Paid bookings are only released by a human, so a real refund is never raced.
  ContactStudio,
  None,
}

impl ManageAction {
  pub fn for_status(status: BookingStatus) -> Self {
    match status {
      BookingStatus::Pending => ManageAction::Cancel,
      BookingStatus::Paid => ManageAction::ContactStudio,
      _ => ManageAction::None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedBooking {
  pub booking: Booking,
  pub session: Session,
  pub action: ManageAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CancelOutcome {
  Cancelled,
  AlreadyClosed { status: BookingStatus },
}

#[derive(Clone)]
pub struct AccessService {
  ledger: BookingLedger,
  catalog: SessionCatalog,
}

impl AccessService {
  pub fn new(ledger: BookingLedger, catalog: SessionCatalog) -> Self {
    Self { ledger, catalog }
  }

  pub fn issue_token(&self) -> String {
    token::issue_token()
  }

  pub async fn resolve(&self, token: &str) -> BookingResult<ManagedBooking> {
    let booking = self.ledger.get_by_management_token(token).await?;
    self.managed(booking).await
  }

  #[instrument(skip(self, token))]
  pub async fn cancel_by_token(&self, token: &str) -> BookingResult<CancelOutcome> {
    let booking = self.ledger.get_by_management_token(token).await?;
    self.cancel(&booking).await
  }

  /// Idempotent: a second call for the same owner finds nothing left to claim.
  #[instrument(skip(self, email))]
  pub async fn claim_guest_bookings(&self, owner_id: Uuid, email: &str) -> BookingResult<Vec<Uuid>> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
      return Err(BookingError::InvalidContact("account has no email address".to_string()));
    }
    let claimed = self.ledger.claim_by_email(owner_id, &email).await?;
    if !claimed.is_empty() {
      event!(Level::INFO, count = claimed.len(), "Guest bookings claimed by account.");
    }
    Ok(claimed)
  }

  /// Newest first, each with its session. Bookings whose session vanished are skipped.
  pub async fn list_for_owner(&self, owner_id: Uuid) -> BookingResult<Vec<ManagedBooking>> {
    let mut listed = Vec::new();
    for booking in self.ledger.list_for_owner(owner_id).await? {
      match self.managed(booking).await {
        Ok(managed) => listed.push(managed),
        Err(BookingError::SessionNotFound { session_id }) => {
          event!(Level::WARN, %session_id, "Owned booking references a missing session.");
        }
        Err(e) => return Err(e),
      }
    }
    Ok(listed)
  }

  #[instrument(skip(self))]
  pub async fn cancel_for_owner(&self, owner_id: Uuid, booking_id: Uuid) -> BookingResult<CancelOutcome> {
    let booking = self.ledger.get_by_id(booking_id).await?;
    if booking.owner_id != Some(owner_id) {
      return Err(BookingError::NotOwner);
    }
    self.cancel(&booking).await
  }

  async fn managed(&self, booking: Booking) -> BookingResult<ManagedBooking> {
    let session = self.catalog.get_by_id(booking.session_id).await?;
    Ok(ManagedBooking {
      action: ManageAction::for_status(booking.status),
      booking,
      session,
    })
  }

  async fn cancel(&self, booking: &Booking) -> BookingResult<CancelOutcome> {
    // The status read above may be stale; the guarded transition decides.
    match self.ledger.cancel_if_pending(booking.id).await? {
      TransitionOutcome::Applied { .. } => Ok(CancelOutcome::Cancelled),
      TransitionOutcome::Unchanged {
        current: BookingStatus::Paid,
      } => Err(BookingError::CancellationRequiresReview),
      TransitionOutcome::Unchanged { current } => Ok(CancelOutcome::AlreadyClosed { status: current }),
    }
  }
}
