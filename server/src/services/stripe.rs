// studio_booking_server/src/services/stripe.rs

//! Hosted-checkout client for the Stripe REST API.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use studio_booking::{CheckoutHandle, CheckoutRequest, PaymentProcessor, ProcessorError};
use tracing::{event, instrument, Level};

// The processor refuses expiries outside this window, measured from creation.
const MIN_EXPIRY_MINUTES: i64 = studio_booking::MIN_PENDING_HOLD_MINUTES;
const MAX_EXPIRY_HOURS: i64 = 24;

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
  id: String,
  url: Option<String>,
}

pub struct StripeProcessor {
  client: reqwest::Client,
  api_base: String,
  secret_key: String,
  timeout: std::time::Duration,
}

impl StripeProcessor {
  pub fn new(api_base: &str, secret_key: &str, timeout: std::time::Duration) -> Result<Self, ProcessorError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ProcessorError::Transport(e.to_string()))?;
    Ok(Self {
      client,
      api_base: api_base.trim_end_matches('/').to_string(),
      secret_key: secret_key.to_string(),
      timeout,
    })
  }
}

pub fn clamp_expiry(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
  let earliest = now + Duration::minutes(MIN_EXPIRY_MINUTES);
  let latest = now + Duration::hours(MAX_EXPIRY_HOURS);
  expires_at.clamp(earliest, latest).timestamp()
}

/// Form fields of a `POST /v1/checkout/sessions` call.
pub fn checkout_form(request: &CheckoutRequest, now: DateTime<Utc>) -> Vec<(String, String)> {
  let booking_id = request.booking_id.to_string();
  let session_id = request.session_id.to_string();
  let mut form: Vec<(String, String)> = vec![
    ("mode".into(), "payment".into()),
    ("success_url".into(), request.success_url.clone()),
    ("cancel_url".into(), request.cancel_url.clone()),
    ("customer_email".into(), request.customer_email.clone()),
    ("client_reference_id".into(), booking_id.clone()),
    ("line_items[0][quantity]".into(), "1".into()),
    ("line_items[0][price_data][currency]".into(), request.currency.clone()),
    ("line_items[0][price_data][unit_amount]".into(), request.amount.to_string()),
    (
      "line_items[0][price_data][product_data][name]".into(),
      request.product_name.clone(),
    ),
    (
      "line_items[0][price_data][product_data][description]".into(),
      request.product_description.clone(),
    ),
    ("metadata[booking_id]".into(), booking_id.clone()),
    ("metadata[session_id]".into(), session_id.clone()),
    ("payment_intent_data[metadata][booking_id]".into(), booking_id),
    ("payment_intent_data[metadata][session_id]".into(), session_id),
  ];
  if let Some(expires_at) = request.expires_at {
    form.push(("expires_at".into(), clamp_expiry(expires_at, now).to_string()));
  }
  form
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
  #[instrument(name = "stripe::create_checkout_session", skip(self, request), fields(booking_id = %request.booking_id))]
  async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutHandle, ProcessorError> {
    let form = checkout_form(request, Utc::now());
    let response = self
      .client
      .post(format!("{}/v1/checkout/sessions", self.api_base))
      .bearer_auth(&self.secret_key)
      .header("Idempotency-Key", request.booking_id.to_string())
      .form(&form)
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          ProcessorError::Timeout(self.timeout)
        } else {
          ProcessorError::Transport(e.to_string())
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      event!(Level::WARN, status = status.as_u16(), "Checkout session request was rejected.");
      return Err(ProcessorError::Rejected {
        status: status.as_u16(),
        body,
      });
    }

    let session: CheckoutSessionResponse = response
      .json()
      .await
      .map_err(|e| ProcessorError::InvalidResponse(e.to_string()))?;
    let url = session
      .url
      .filter(|url| !url.is_empty())
      .ok_or_else(|| ProcessorError::InvalidResponse(format!("checkout session {} has no url", session.id)))?;
    event!(Level::INFO, checkout_handle = %session.id, "Checkout session created.");
    Ok(CheckoutHandle { id: session.id, url })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use uuid::Uuid;

  fn request(expires_at: Option<DateTime<Utc>>) -> CheckoutRequest {
    CheckoutRequest {
      booking_id: Uuid::from_u128(7),
      session_id: Uuid::from_u128(9),
      product_name: "Morning Vinyasa".into(),
      product_description: "2026-11-02 at 07:00–08:00 - Studio A".into(),
      amount: 1800,
      currency: "eur".into(),
      customer_email: "ada@example.com".into(),
      success_url: "https://studio.test/booking/success?session_id={CHECKOUT_SESSION_ID}".into(),
      cancel_url: "https://studio.test/booking/cancelled".into(),
      expires_at,
    }
  }

  fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
  }

  #[test]
  fn form_carries_line_item_and_correlation_metadata() {
    let now = Utc.with_ymd_and_hms(2026, 11, 1, 9, 0, 0).unwrap();
    let form = checkout_form(&request(None), now);
    let booking_id = Uuid::from_u128(7).to_string();

    assert_eq!(field(&form, "line_items[0][price_data][unit_amount]"), Some("1800"));
    assert_eq!(field(&form, "line_items[0][quantity]"), Some("1"));
    assert_eq!(field(&form, "metadata[booking_id]"), Some(booking_id.as_str()));
    assert_eq!(
      field(&form, "payment_intent_data[metadata][booking_id]"),
      Some(booking_id.as_str())
    );
    assert_eq!(field(&form, "customer_email"), Some("ada@example.com"));
    assert!(field(&form, "expires_at").is_none());
  }

  #[test]
  fn expiry_is_clamped_into_the_accepted_window() {
    let now = Utc.with_ymd_and_hms(2026, 11, 1, 9, 0, 0).unwrap();
    assert_eq!(
      clamp_expiry(now + Duration::minutes(5), now),
      (now + Duration::minutes(MIN_EXPIRY_MINUTES)).timestamp()
    );
    assert_eq!(
      clamp_expiry(now + Duration::hours(2), now),
      (now + Duration::hours(2)).timestamp()
    );
    assert_eq!(
      clamp_expiry(now + Duration::days(3), now),
      (now + Duration::hours(MAX_EXPIRY_HOURS)).timestamp()
    );

    let form = checkout_form(&request(Some(now + Duration::hours(1))), now);
    let expected = (now + Duration::hours(1)).timestamp().to_string();
    assert_eq!(field(&form, "expires_at"), Some(expected.as_str()));
  }
}
