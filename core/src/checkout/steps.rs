// studio_booking/src/checkout/steps.rs

use tracing::{event, Level};

use super::CheckoutCtx;
use crate::capacity::can_admit_at_intake;
use crate::error::{BookingError, BookingResult, ProcessorError};
use crate::flow::{FlowControl, FlowData};
use crate::model::Contact;
use crate::processor::CheckoutRequest;

// Each step copies what it needs out of the guard before awaiting.

pub(super) async fn load_session(data: FlowData<CheckoutCtx>) -> BookingResult<FlowControl> {
  let (catalog, session_id) = data.with(|ctx| (ctx.catalog.clone(), ctx.request.session_id));
  let session = catalog.get_by_id(session_id).await?;
  data.write().session = Some(session);
  Ok(FlowControl::Continue)
}

pub(super) async fn admit_at_intake(data: FlowData<CheckoutCtx>) -> BookingResult<FlowControl> {
  let (ledger, session, now) = data.with(|ctx| (ctx.ledger.clone(), ctx.session.clone(), ctx.now));
  let session = session.ok_or_else(|| missing("session"))?;
  let paid = ledger.store().count_paid(session.id).await?;
  can_admit_at_intake(&session, paid, now)?;
  Ok(FlowControl::Continue)
}

pub(super) async fn validate_contact(data: FlowData<CheckoutCtx>) -> BookingResult<FlowControl> {
  data.update(|ctx| {
    let request = &ctx.request;
    let contact = Contact::parse(request.name.as_deref(), &request.email, request.phone.as_deref())?;
    ctx.contact = Some(contact);
    Ok(FlowControl::Continue)
  })
}

pub(super) async fn check_price(data: FlowData<CheckoutCtx>) -> BookingResult<FlowControl> {
  data.with(|ctx| match &ctx.session {
    Some(session) if session.price > 0 => Ok(FlowControl::Continue),
    Some(session) => Err(BookingError::NoPrice { session_id: session.id }),
    None => Err(missing("session")),
  })
}

pub(super) async fn create_pending_booking(data: FlowData<CheckoutCtx>) -> BookingResult<FlowControl> {
  let (ledger, session, contact, owner_id, now) = data.with(|ctx| {
    (
      ctx.ledger.clone(),
      ctx.session.clone(),
      ctx.contact.clone(),
      ctx.request.owner_id,
      ctx.now,
    )
  });
  let session = session.ok_or_else(|| missing("session"))?;
  let contact = contact.ok_or_else(|| missing("contact"))?;
  let booking = ledger.create(&session, contact, owner_id, now).await?;
  data.write().booking = Some(booking);
  Ok(FlowControl::Continue)
}

pub(super) async fn request_checkout_handle(data: FlowData<CheckoutCtx>) -> BookingResult<FlowControl> {
  let (ledger, processor, timeout, request) = {
    let ctx = data.read();
    let session = ctx.session.as_ref().ok_or_else(|| missing("session"))?;
    let booking = ctx.booking.as_ref().ok_or_else(|| missing("booking"))?;
    let request = CheckoutRequest {
      booking_id: booking.id,
      session_id: session.id,
      product_name: session.title.clone(),
      product_description: session.checkout_description(),
      amount: booking.amount,
      currency: booking.currency.clone(),
      customer_email: booking.contact_email.clone(),
      success_url: ctx.config.success_url.clone(),
      cancel_url: ctx.config.cancel_url.clone(),
      expires_at: ctx.config.pending_hold.map(|hold| ctx.now + hold),
    };
    (ctx.ledger.clone(), ctx.processor.clone(), ctx.config.processor_timeout, request)
  };

  let result = match tokio::time::timeout(timeout, processor.create_checkout_session(&request)).await {
    Ok(result) => result,
    Err(_) => Err(ProcessorError::Timeout(timeout)),
  };

  match result {
    Ok(handle) => {
      data.write().handle = Some(handle);
      Ok(FlowControl::Continue)
    }
    Err(source) => {
      event!(Level::ERROR, booking_id = %request.booking_id, error = %source, "Processor refused checkout, voiding booking.");
      if let Err(void_err) = ledger.void(request.booking_id).await {
        event!(Level::ERROR, booking_id = %request.booking_id, error = %void_err, "Failed to void booking after processor failure.");
      }
      Err(BookingError::CheckoutCreationFailed { source })
    }
  }
}

/// A failure here leaves the booking pending without a handle. Webhooks still
/// correlate through the booking id metadata, and expiry releases it otherwise.
pub(super) async fn persist_checkout_handle(data: FlowData<CheckoutCtx>) -> BookingResult<FlowControl> {
  let (ledger, booking_id, handle) = {
    let ctx = data.read();
    let booking = ctx.booking.as_ref().ok_or_else(|| missing("booking"))?;
    let handle = ctx.handle.as_ref().ok_or_else(|| missing("checkout handle"))?;
    (ctx.ledger.clone(), booking.id, handle.id.clone())
  };
  ledger.attach_checkout_handle(booking_id, &handle).await?;
  data.update(|ctx| {
    if let Some(booking) = ctx.booking.as_mut() {
      booking.checkout_handle = Some(handle);
    }
  });
  Ok(FlowControl::Continue)
}

fn missing(what: &str) -> BookingError {
  BookingError::storage(anyhow::anyhow!("checkout flow reached a step without a {}", what))
}
