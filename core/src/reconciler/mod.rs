// studio_booking/src/reconciler/mod.rs

//! Payment Event Reconciler: applies authenticated, possibly duplicated,
//! possibly out-of-order processor notifications to the ledger.

pub mod notification;
pub mod review;
pub mod signature;
mod steps;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{event, instrument, Level};
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};
use crate::flow::{Flow, FlowData, FlowOutcome};
use crate::model::{Booking, BookingStatus, RefundReview};
use crate::store::BookingStore;

pub use notification::{parse_event, ParsedEvent, PaymentEvent};
pub use review::{CapacityLossHandler, ManualRefundReview};
pub use signature::SignatureVerifier;

pub const RECONCILE_FLOW: &str = "reconcile_payment_event";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
  MissingCorrelation,
  BookingNotFound,
}

/// Every variant is acknowledged to the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
  Applied {
    booking_id: Uuid,
    from: BookingStatus,
    to: BookingStatus,
  },
  Unchanged {
    booking_id: Uuid,
    current: BookingStatus,
    review_queued: bool,
  },
  /// Paid after the session filled: booking cancelled, refund review queued.
  CapacityLost { booking_id: Uuid },
  Duplicate,
  Discarded { reason: DiscardReason },
  Ignored { event_type: String },
}

/// Per-notification state shared by the reconcile steps.
pub struct ReconcileCtx {
  pub store: Arc<dyn BookingStore>,
  pub verifier: SignatureVerifier,
  pub review_handler: Arc<dyn CapacityLossHandler>,
  pub now: DateTime<Utc>,
  /// Set when the caller hands over an already verified and parsed event.
  pub prefilled: bool,
  pub raw: Vec<u8>,
  pub signature: String,

  pub event: Option<PaymentEvent>,
  pub booking: Option<Booking>,
  pub outcome: Option<ReconcileOutcome>,
  pub queued_review: Option<RefundReview>,
}

pub struct Reconciler {
  flow: Arc<Flow<ReconcileCtx, BookingError>>,
  store: Arc<dyn BookingStore>,
  verifier: SignatureVerifier,
  review_handler: Arc<dyn CapacityLossHandler>,
}

impl Reconciler {
  pub fn new(store: Arc<dyn BookingStore>, verifier: SignatureVerifier) -> Self {
    Self {
      flow: Arc::new(build_reconcile_flow()),
      store,
      verifier,
      review_handler: Arc::new(ManualRefundReview),
    }
  }

  pub fn with_review_handler(mut self, handler: Arc<dyn CapacityLossHandler>) -> Self {
    self.review_handler = handler;
    self
  }

  pub fn verifier(&self) -> &SignatureVerifier {
    &self.verifier
  }

  /// Entry point for the webhook: verifies the signature over the raw body, then parses and applies.
  ///
  /// `InvalidSignature` and `MalformedEvent` must not be acknowledged. Storage
  /// errors are transient. Everything else is a settled outcome.
  #[instrument(name = "receive_payment_event", skip_all)]
  pub async fn receive(&self, raw: &[u8], signature: &str, now: DateTime<Utc>) -> BookingResult<ReconcileOutcome> {
    self.execute(self.ctx(raw.to_vec(), signature.to_string(), None, now)).await
  }

  /// Applies an event that was already authenticated and parsed elsewhere.
  #[instrument(name = "reconcile_payment_event", skip_all, fields(event_id = %event.event_id))]
  pub async fn reconcile(&self, event: PaymentEvent, now: DateTime<Utc>) -> BookingResult<ReconcileOutcome> {
    self.execute(self.ctx(Vec::new(), String::new(), Some(event), now)).await
  }

  fn ctx(&self, raw: Vec<u8>, signature: String, event: Option<PaymentEvent>, now: DateTime<Utc>) -> ReconcileCtx {
    ReconcileCtx {
      store: self.store.clone(),
      verifier: self.verifier.clone(),
      review_handler: self.review_handler.clone(),
      now,
      prefilled: event.is_some(),
      raw,
      signature,
      event,
      booking: None,
      outcome: None,
      queued_review: None,
    }
  }

  async fn execute(&self, ctx: ReconcileCtx) -> BookingResult<ReconcileOutcome> {
    let data = FlowData::new(ctx);
    let flow_outcome = self.flow.run(data.clone()).await?;
    let outcome = data.write().outcome.take();
    match (flow_outcome, outcome) {
      (_, Some(outcome)) => {
        event!(Level::INFO, outcome = ?outcome, "Payment event reconciled.");
        Ok(outcome)
      }
      (FlowOutcome::Stopped { step }, None) => Err(BookingError::storage(anyhow::anyhow!(
        "reconcile flow stopped at '{}' without an outcome",
        step
      ))),
      (FlowOutcome::Completed, None) => Err(BookingError::storage(anyhow::anyhow!(
        "reconcile flow completed without an outcome"
      ))),
    }
  }
}

fn build_reconcile_flow() -> Flow<ReconcileCtx, BookingError> {
  let mut flow: Flow<ReconcileCtx, BookingError> = Flow::new(
    RECONCILE_FLOW,
    &[
      ("verify_signature", false),
      ("parse_event", false),
      ("skip_duplicate", false),
      ("resolve_booking", false),
      ("apply_event", false),
    ],
  );
  flow
    .skip_step_if("verify_signature", |data| data.read().prefilled)
    .skip_step_if("parse_event", |data| data.read().prefilled)
    .on_step("verify_signature", steps::verify_signature)
    .on_step("parse_event", steps::parse_event)
    .on_step("skip_duplicate", steps::skip_duplicate)
    .on_step("resolve_booking", steps::resolve_booking)
    .on_step("apply_event", steps::apply_event)
    .after_step("apply_event", steps::hand_off_refund_review);
  flow
}
