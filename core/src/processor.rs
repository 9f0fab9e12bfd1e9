// studio_booking/src/processor.rs

//! The payment processor seam used by the Checkout Intent Issuer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProcessorError;

/// Everything the processor needs to render a hosted checkout page for one booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
  /// Correlation id; must come back unmodified in every webhook.
  pub booking_id: Uuid,
  pub session_id: Uuid,
  pub product_name: String,
  pub product_description: String,
  pub amount: i64,
  pub currency: String,
  pub customer_email: String,
  pub success_url: String,
  pub cancel_url: String,
  pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutHandle {
  pub id: String,
  pub url: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync + 'static {
  async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutHandle, ProcessorError>;
}
