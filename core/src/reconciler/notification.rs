// studio_booking/src/reconciler/notification.rs

//! Classification of raw processor notifications into payment events.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};
use crate::model::PaymentEventKind;

/// A notification that matters to bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
  pub event_id: String,
  pub event_type: String,
  pub kind: PaymentEventKind,
  /// Correlation id carried in the processor metadata.
  pub booking_id: Option<Uuid>,
  pub checkout_handle: Option<String>,
  pub payment_handle: Option<String>,
  pub amount: Option<i64>,
  pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
  Payment(PaymentEvent),
  /// Authentic but irrelevant; acknowledged without touching anything.
  Unhandled { event_id: String, event_type: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
  id: String,
  #[serde(rename = "type")]
  event_type: String,
  data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
  object: Value,
}

enum ObjectShape {
  CheckoutSession,
  PaymentIntent,
  Charge,
}

fn classify(event_type: &str) -> Option<(PaymentEventKind, ObjectShape)> {
  use PaymentEventKind::*;
  Some(match event_type {
    "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
      (PaymentSucceeded, ObjectShape::CheckoutSession)
    }
    "checkout.session.async_payment_failed" => (PaymentFailed, ObjectShape::CheckoutSession),
    "checkout.session.expired" => (PaymentExpired, ObjectShape::CheckoutSession),
    "payment_intent.succeeded" => (PaymentSucceeded, ObjectShape::PaymentIntent),
    // A declined attempt leaves the hosted checkout open for another card,
    // so `payment_intent.payment_failed` settles nothing and stays unhandled.
    "charge.refunded" => (PaymentRefunded, ObjectShape::Charge),
    _ => return None,
  })
}

fn string_at(object: &Value, key: &str) -> Option<String> {
  object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Expandable references arrive either as an id string or as an object with an `id`.
fn reference_at(object: &Value, key: &str) -> Option<String> {
  match object.get(key)? {
    Value::String(id) => Some(id.clone()),
    Value::Object(expanded) => expanded.get("id").and_then(Value::as_str).map(str::to_string),
    _ => None,
  }
}

fn first_amount(object: &Value, keys: &[&str]) -> Option<i64> {
  keys.iter().find_map(|key| object.get(*key).and_then(Value::as_i64))
}

fn correlation_id(object: &Value) -> Option<Uuid> {
  let metadata = object.get("metadata")?;
  ["booking_id", "bookingId"]
    .iter()
    .filter_map(|key| metadata.get(*key).and_then(Value::as_str))
    .find_map(|raw| Uuid::parse_str(raw.trim()).ok())
}

pub fn parse_event(raw: &[u8]) -> BookingResult<ParsedEvent> {
  let envelope: Envelope =
    serde_json::from_slice(raw).map_err(|e| BookingError::MalformedEvent(format!("unreadable event body: {}", e)))?;
  if envelope.id.is_empty() {
    return Err(BookingError::MalformedEvent("event id is empty".into()));
  }

  let Some((kind, shape)) = classify(&envelope.event_type) else {
    return Ok(ParsedEvent::Unhandled {
      event_id: envelope.id,
      event_type: envelope.event_type,
    });
  };

  let object = &envelope.data.object;
  if !object.is_object() {
    return Err(BookingError::MalformedEvent("data.object is not an object".into()));
  }

  // A completed checkout paid by a delayed method is settled by a later async event.
  if envelope.event_type == "checkout.session.completed"
    && object.get("payment_status").and_then(Value::as_str) == Some("unpaid")
  {
    return Ok(ParsedEvent::Unhandled {
      event_id: envelope.id,
      event_type: envelope.event_type,
    });
  }

  let (checkout_handle, payment_handle, amount) = match shape {
    ObjectShape::CheckoutSession => (
      string_at(object, "id"),
      reference_at(object, "payment_intent"),
      first_amount(object, &["amount_total", "amount_subtotal"]),
    ),
    ObjectShape::PaymentIntent => (
      None,
      string_at(object, "id"),
      first_amount(object, &["amount_received", "amount"]),
    ),
    ObjectShape::Charge => (
      string_at(object, "checkout_session"),
      reference_at(object, "payment_intent"),
      first_amount(object, &["amount_refunded", "amount"]),
    ),
  };

  Ok(ParsedEvent::Payment(PaymentEvent {
    event_id: envelope.id,
    event_type: envelope.event_type,
    kind,
    booking_id: correlation_id(object),
    checkout_handle,
    payment_handle,
    amount,
    currency: string_at(object, "currency").map(|c| c.to_lowercase()),
  }))
}
