// studio_booking/src/reconciler/steps.rs

use tracing::{event, Level};

use super::notification::{self, ParsedEvent};
use super::{DiscardReason, ReconcileCtx, ReconcileOutcome};
use crate::error::{BookingError, BookingResult};
use crate::flow::{FlowControl, FlowData};
use crate::model::PaymentEventKind;
use crate::store::{PaymentApplication, PaymentEventCommand};

fn settle(data: &FlowData<ReconcileCtx>, outcome: ReconcileOutcome) -> BookingResult<FlowControl> {
  data.write().outcome = Some(outcome);
  Ok(FlowControl::Stop)
}

pub(super) async fn verify_signature(data: FlowData<ReconcileCtx>) -> BookingResult<FlowControl> {
  data.with(|ctx| ctx.verifier.verify(&ctx.raw, &ctx.signature, ctx.now))?;
  Ok(FlowControl::Continue)
}

pub(super) async fn parse_event(data: FlowData<ReconcileCtx>) -> BookingResult<FlowControl> {
  let parsed = data.with(|ctx| notification::parse_event(&ctx.raw))?;
  match parsed {
    ParsedEvent::Payment(payment) => {
      data.write().event = Some(payment);
      Ok(FlowControl::Continue)
    }
    ParsedEvent::Unhandled { event_id, event_type } => {
      event!(Level::INFO, %event_id, %event_type, "Unhandled event type acknowledged.");
      settle(&data, ReconcileOutcome::Ignored { event_type })
    }
  }
}

/// Fast path only. The atomic apply re-checks the event id.
pub(super) async fn skip_duplicate(data: FlowData<ReconcileCtx>) -> BookingResult<FlowControl> {
  let (store, event_id) = data.with(|ctx| (ctx.store.clone(), ctx.event.as_ref().map(|e| e.event_id.clone())));
  let event_id = event_id.ok_or_else(missing_event)?;
  if store.has_payment_event(&event_id).await? {
    event!(Level::INFO, %event_id, "Duplicate payment event acknowledged.");
    return settle(&data, ReconcileOutcome::Duplicate);
  }
  Ok(FlowControl::Continue)
}

pub(super) async fn resolve_booking(data: FlowData<ReconcileCtx>) -> BookingResult<FlowControl> {
  let (store, event) = data.with(|ctx| (ctx.store.clone(), ctx.event.clone()));
  let event = event.ok_or_else(missing_event)?;

  // Metadata first, then the handles the booking may already carry.
  let booking = match (event.booking_id, event.checkout_handle.as_deref(), event.payment_handle.as_deref()) {
    (Some(booking_id), _, _) => store.get_booking(booking_id).await?,
    (None, Some(handle), _) => store.find_by_checkout_handle(handle).await?,
    (None, None, Some(handle)) => store.find_by_payment_handle(handle).await?,
    (None, None, None) => {
      event!(Level::WARN, event_id = %event.event_id, event_type = %event.event_type, "Payment event carries no booking correlation, discarding.");
      return settle(&data, ReconcileOutcome::Discarded {
        reason: DiscardReason::MissingCorrelation,
      });
    }
  };

  match booking {
    Some(booking) => {
      data.write().booking = Some(booking);
      Ok(FlowControl::Continue)
    }
    None => {
      event!(Level::WARN, event_id = %event.event_id, booking_id = ?event.booking_id, "Payment event references an unknown booking, discarding.");
      settle(&data, ReconcileOutcome::Discarded {
        reason: DiscardReason::BookingNotFound,
      })
    }
  }
}

pub(super) async fn apply_event(data: FlowData<ReconcileCtx>) -> BookingResult<FlowControl> {
  let (store, event, booking, now) = data.with(|ctx| (ctx.store.clone(), ctx.event.clone(), ctx.booking.clone(), ctx.now));
  let event = event.ok_or_else(missing_event)?;
  let booking = booking.ok_or_else(|| BookingError::storage(anyhow::anyhow!("reconcile flow lost its booking")))?;

  if event.kind == PaymentEventKind::PaymentSucceeded {
    let amount_differs = event.amount.is_some_and(|amount| amount != booking.amount);
    let currency_differs = event.currency.as_deref().is_some_and(|c| c != booking.currency);
    if amount_differs || currency_differs {
      event!(
        Level::WARN,
        booking_id = %booking.id,
        captured_amount = booking.amount,
        observed_amount = ?event.amount,
        observed_currency = ?event.currency,
        "Observed payment does not match the captured amount."
      );
    }
  }

  let command = PaymentEventCommand {
    event_id: event.event_id.clone(),
    booking_id: booking.id,
    kind: event.kind,
    payment_handle: event.payment_handle.clone(),
    amount: event.amount,
    currency: event.currency.clone(),
    received_at: now,
  };

  let application = match store.apply_payment_event(&command).await {
    Ok(application) => application,
    // Removed between lookup and apply.
    Err(BookingError::BookingNotFound) => {
      return settle(&data, ReconcileOutcome::Discarded {
        reason: DiscardReason::BookingNotFound,
      })
    }
    Err(e) => return Err(e),
  };

  let booking_id = booking.id;
  let (outcome, review) = match application {
    PaymentApplication::Duplicate => (ReconcileOutcome::Duplicate, None),
    PaymentApplication::Applied { from, to } => (ReconcileOutcome::Applied { booking_id, from, to }, None),
    PaymentApplication::CapacityLost { review } => (ReconcileOutcome::CapacityLost { booking_id }, Some(review)),
    PaymentApplication::Unchanged { current, review } => (
      ReconcileOutcome::Unchanged {
        booking_id,
        current,
        review_queued: review.is_some(),
      },
      review,
    ),
  };
  data.update(|ctx| {
    ctx.outcome = Some(outcome);
    ctx.queued_review = review;
  });
  Ok(FlowControl::Continue)
}

/// The review row is already committed; a failing handler is logged, never retried by redelivery.
pub(super) async fn hand_off_refund_review(data: FlowData<ReconcileCtx>) -> BookingResult<FlowControl> {
  let (handler, review) = data.with(|ctx| (ctx.review_handler.clone(), ctx.queued_review.clone()));
  if let Some(review) = review {
    if let Err(e) = handler.on_refund_review(&review).await {
      event!(Level::ERROR, booking_id = %review.booking_id, error = %e, "Refund review handler failed.");
    }
  }
  Ok(FlowControl::Continue)
}

fn missing_event() -> BookingError {
  BookingError::storage(anyhow::anyhow!("reconcile flow reached a step without a parsed event"))
}
