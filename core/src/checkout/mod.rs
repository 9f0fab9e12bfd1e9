// studio_booking/src/checkout/mod.rs

//! Checkout Intent Issuer: turns a booking request into a pending booking and
//! a hosted checkout page at the payment processor.

mod steps;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, Level};
use uuid::Uuid;

use crate::catalog::SessionCatalog;
use crate::config::BookingConfig;
use crate::error::{BookingError, BookingResult};
use crate::flow::{Flow, FlowData, FlowOutcome};
use crate::ledger::BookingLedger;
use crate::model::{Booking, Contact, Session};
use crate::processor::{CheckoutHandle, PaymentProcessor};

pub const CHECKOUT_FLOW: &str = "checkout";

/// Input of a checkout attempt. `owner_id` is set for signed-in customers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStart {
  pub session_id: Uuid,
  #[serde(default)]
  pub name: Option<String>,
  pub email: String,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(skip)]
  pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStarted {
  pub checkout_url: String,
  pub booking_id: Uuid,
  /// Only returned for guests, who have no other way back to the booking.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub manage_token: Option<String>,
}

/// Per-attempt state shared by the checkout steps.
pub struct CheckoutCtx {
  pub catalog: SessionCatalog,
  pub ledger: BookingLedger,
  pub processor: Arc<dyn PaymentProcessor>,
  pub config: Arc<BookingConfig>,
  pub request: CheckoutStart,
  pub now: DateTime<Utc>,

  pub session: Option<Session>,
  pub contact: Option<Contact>,
  pub booking: Option<Booking>,
  pub handle: Option<CheckoutHandle>,
}

pub struct CheckoutIssuer {
  flow: Arc<Flow<CheckoutCtx, BookingError>>,
  catalog: SessionCatalog,
  ledger: BookingLedger,
  processor: Arc<dyn PaymentProcessor>,
  config: Arc<BookingConfig>,
}

impl CheckoutIssuer {
  pub fn new(
    catalog: SessionCatalog,
    ledger: BookingLedger,
    processor: Arc<dyn PaymentProcessor>,
    config: Arc<BookingConfig>,
  ) -> Self {
    Self {
      flow: Arc::new(build_checkout_flow()),
      catalog,
      ledger,
      processor,
      config,
    }
  }

  pub fn flow(&self) -> &Flow<CheckoutCtx, BookingError> {
    &self.flow
  }

  /// Validates, creates the pending booking, then calls the processor. The
  /// booking row exists before the external call so nothing is held while waiting.
  #[instrument(name = "start_checkout", skip(self, request), fields(session_id = %request.session_id, guest = request.owner_id.is_none()))]
  pub async fn start_checkout(&self, request: CheckoutStart, now: DateTime<Utc>) -> BookingResult<CheckoutStarted> {
    let data = FlowData::new(CheckoutCtx {
      catalog: self.catalog.clone(),
      ledger: self.ledger.clone(),
      processor: self.processor.clone(),
      config: self.config.clone(),
      request,
      now,
      session: None,
      contact: None,
      booking: None,
      handle: None,
    });

    if let FlowOutcome::Stopped { step } = self.flow.run(data.clone()).await? {
      return Err(BookingError::storage(anyhow::anyhow!(
        "checkout flow stopped early at step '{}'",
        step
      )));
    }

    let guard = data.read();
    match (&guard.booking, &guard.handle) {
      (Some(booking), Some(handle)) => {
        tracing::event!(Level::INFO, booking_id = %booking.id, checkout_handle = %handle.id, "Checkout issued.");
        Ok(CheckoutStarted {
          checkout_url: handle.url.clone(),
          booking_id: booking.id,
          manage_token: booking.is_guest().then(|| booking.manage_token.clone()),
        })
      }
      _ => Err(BookingError::storage(anyhow::anyhow!(
        "checkout flow completed without a booking and checkout handle"
      ))),
    }
  }
}

fn build_checkout_flow() -> Flow<CheckoutCtx, BookingError> {
  let mut flow: Flow<CheckoutCtx, BookingError> = Flow::new(
    CHECKOUT_FLOW,
    &[
      ("load_session", false),
      ("admit_at_intake", false),
      ("validate_contact", false),
      ("check_price", false),
      ("create_pending_booking", false),
      ("request_checkout_handle", false),
      ("persist_checkout_handle", false),
    ],
  );
  flow
    .on_step("load_session", steps::load_session)
    .on_step("admit_at_intake", steps::admit_at_intake)
    .on_step("validate_contact", steps::validate_contact)
    .on_step("check_price", steps::check_price)
    .on_step("create_pending_booking", steps::create_pending_booking)
    .on_step("request_checkout_handle", steps::request_checkout_handle)
    .on_step("persist_checkout_handle", steps::persist_checkout_handle);
  flow
}
