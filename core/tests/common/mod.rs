// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use studio_booking::{
  BookingConfig, BookingServices, BookingStore, CheckoutHandle, CheckoutRequest, CheckoutStart, CheckoutStarted,
  MemoryStore, PaymentProcessor, ProcessorError, Session, SignatureVerifier,
};
use tracing::Level;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_studio";
pub const SITE_URL: &str = "https://studio.test";

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Fake payment processor ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorMode {
  Accept,
  Reject,
  Hang,
}

pub struct FakeProcessor {
  mode: Mutex<ProcessorMode>,
  issued: AtomicUsize,
  requests: Mutex<Vec<CheckoutRequest>>,
}

impl FakeProcessor {
  pub fn new(mode: ProcessorMode) -> Self {
    Self {
      mode: Mutex::new(mode),
      issued: AtomicUsize::new(0),
      requests: Mutex::new(Vec::new()),
    }
  }

  pub fn set_mode(&self, mode: ProcessorMode) {
    *self.mode.lock() = mode;
  }

  pub fn requests(&self) -> Vec<CheckoutRequest> {
    self.requests.lock().clone()
  }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
  async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutHandle, ProcessorError> {
    self.requests.lock().push(request.clone());
    let mode = *self.mode.lock();
    match mode {
      ProcessorMode::Accept => {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{}", n);
        Ok(CheckoutHandle {
          url: format!("https://checkout.test/pay/{}", id),
          id,
        })
      }
      ProcessorMode::Reject => Err(ProcessorError::Rejected {
        status: 402,
        body: "card_declined".to_string(),
      }),
      ProcessorMode::Hang => {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Err(ProcessorError::Transport("unreachable".to_string()))
      }
    }
  }
}

// --- Harness ---
pub struct Harness {
  pub store: Arc<MemoryStore>,
  pub processor: Arc<FakeProcessor>,
  pub services: Arc<BookingServices>,
}

impl Harness {
  pub fn new() -> Self {
    Self::with_config(BookingConfig::for_site(SITE_URL))
  }

  pub fn with_config(config: BookingConfig) -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::new());
    let processor = Arc::new(FakeProcessor::new(ProcessorMode::Accept));
    let services = BookingServices::new(store.clone(), processor.clone(), config, WEBHOOK_SECRET)
      .expect("test services must build");
    Self {
      store,
      processor,
      services: Arc::new(services),
    }
  }

  pub async fn add_session(&self, capacity: Option<i32>, price: i64) -> Session {
    let session = upcoming_session(capacity, price);
    self.store.insert_session(&session).await.unwrap();
    session
  }

  pub async fn start_guest(&self, session_id: Uuid, email: &str) -> CheckoutStarted {
    self
      .services
      .checkout
      .start_checkout(guest_request(session_id, email), Utc::now())
      .await
      .unwrap()
  }

  /// Signs `event` and runs it through the webhook entry point.
  pub async fn deliver(&self, event: &Value) -> studio_booking::BookingResult<studio_booking::ReconcileOutcome> {
    let (body, signature) = signed(event);
    self.services.reconciler.receive(&body, &signature, Utc::now()).await
  }

  pub async fn status_of(&self, booking_id: Uuid) -> studio_booking::BookingStatus {
    self.store.get_booking(booking_id).await.unwrap().unwrap().status
  }
}

// --- Fixtures ---
pub fn upcoming_session(capacity: Option<i32>, price: i64) -> Session {
  let starts_at = Utc::now() + Duration::days(3);
  Session {
    id: Uuid::new_v4(),
    title: "Evening Flow".to_string(),
    description: Some("All levels".to_string()),
    location: Some("Studio A".to_string()),
    starts_at,
    ends_at: starts_at + Duration::minutes(75),
    price,
    currency: "eur".to_string(),
    capacity,
    active: true,
    created_at: Utc::now() - Duration::days(10),
  }
}

pub fn guest_request(session_id: Uuid, email: &str) -> CheckoutStart {
  CheckoutStart {
    session_id,
    name: Some("Guest".to_string()),
    email: email.to_string(),
    phone: None,
    owner_id: None,
  }
}

pub fn signed_at(event: &Value, at: DateTime<Utc>) -> (Vec<u8>, String) {
  let body = serde_json::to_vec(event).unwrap();
  let verifier = SignatureVerifier::new(WEBHOOK_SECRET, std::time::Duration::from_secs(300));
  let signature = verifier.sign(&body, at.timestamp()).unwrap();
  (body, signature)
}

pub fn signed(event: &Value) -> (Vec<u8>, String) {
  signed_at(event, Utc::now())
}

// --- Processor notifications ---
pub fn checkout_completed(event_id: &str, booking_id: Uuid, amount: i64) -> Value {
  json!({
    "id": event_id,
    "type": "checkout.session.completed",
    "data": { "object": {
      "id": format!("cs_for_{}", booking_id.simple()),
      "object": "checkout.session",
      "payment_intent": format!("pi_for_{}", booking_id.simple()),
      "payment_status": "paid",
      "amount_total": amount,
      "currency": "eur",
      "metadata": { "booking_id": booking_id.to_string() }
    }}
  })
}

/// Terminal failure of a delayed payment method; the checkout session is over.
pub fn payment_failed(event_id: &str, booking_id: Uuid) -> Value {
  json!({
    "id": event_id,
    "type": "checkout.session.async_payment_failed",
    "data": { "object": {
      "id": format!("cs_for_{}", booking_id.simple()),
      "object": "checkout.session",
      "payment_intent": format!("pi_for_{}", booking_id.simple()),
      "payment_status": "unpaid",
      "amount_total": 1800,
      "currency": "eur",
      "metadata": { "booking_id": booking_id.to_string() }
    }}
  })
}

/// A single declined card attempt inside a checkout that stays open.
pub fn card_declined(event_id: &str, booking_id: Uuid) -> Value {
  json!({
    "id": event_id,
    "type": "payment_intent.payment_failed",
    "data": { "object": {
      "id": format!("pi_for_{}", booking_id.simple()),
      "amount": 1800,
      "currency": "eur",
      "last_payment_error": { "code": "card_declined" },
      "metadata": { "booking_id": booking_id.to_string() }
    }}
  })
}

pub fn charge_refunded(event_id: &str, booking_id: Uuid, amount: i64) -> Value {
  json!({
    "id": event_id,
    "type": "charge.refunded",
    "data": { "object": {
      "id": format!("ch_for_{}", booking_id.simple()),
      "payment_intent": format!("pi_for_{}", booking_id.simple()),
      "amount": amount,
      "amount_refunded": amount,
      "currency": "eur",
      "metadata": { "booking_id": booking_id.to_string() }
    }}
  })
}

pub fn checkout_expired(event_id: &str, checkout_handle: &str) -> Value {
  json!({
    "id": event_id,
    "type": "checkout.session.expired",
    "data": { "object": { "id": checkout_handle, "payment_status": "unpaid", "metadata": {} } }
  })
}
