// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use studio_booking::{
  Booking, BookingError, BookingResult, BookingStatus, BookingStore, CheckoutHandle, CheckoutRequest, MemoryStore,
  PaymentApplication, PaymentEventCommand, PaymentEventRecord, PaymentProcessor, ProcessorError, RefundReview,
  Session, SignatureVerifier, TransitionEffect, TransitionOutcome,
};
use studio_booking_server::config::AppConfig;
use studio_booking_server::state::AppState;
use tracing::Level;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_http_tests";

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

/// Hands out `cs_http_<n>` handles, or fails every call once `failing` is set.
#[derive(Default)]
pub struct StubProcessor {
  issued: AtomicUsize,
  failing: AtomicBool,
}

impl StubProcessor {
  pub fn fail(&self) {
    self.failing.store(true, Ordering::SeqCst);
  }
}

#[async_trait]
impl PaymentProcessor for StubProcessor {
  async fn create_checkout_session(&self, _request: &CheckoutRequest) -> Result<CheckoutHandle, ProcessorError> {
    if self.failing.load(Ordering::SeqCst) {
      return Err(ProcessorError::Rejected {
        status: 402,
        body: "card_declined".into(),
      });
    }
    let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
    Ok(CheckoutHandle {
      id: format!("cs_http_{}", n),
      url: format!("https://checkout.test/pay/cs_http_{}", n),
    })
  }
}

/// `MemoryStore` whose payment writes fail while `down` is set, like a
/// database that dropped its connections mid-delivery.
pub struct StorageOutage {
  inner: Arc<MemoryStore>,
  down: AtomicBool,
}

impl StorageOutage {
  pub fn new(inner: Arc<MemoryStore>) -> Self {
    Self {
      inner,
      down: AtomicBool::new(false),
    }
  }

  pub fn set_down(&self, down: bool) {
    self.down.store(down, Ordering::SeqCst);
  }
}

#[async_trait]
impl BookingStore for StorageOutage {
  async fn insert_session(&self, session: &Session) -> BookingResult<()> {
    self.inner.insert_session(session).await
  }

  async fn get_session(&self, session_id: Uuid) -> BookingResult<Option<Session>> {
    self.inner.get_session(session_id).await
  }

  async fn list_upcoming_sessions(&self, now: DateTime<Utc>) -> BookingResult<Vec<(Session, i64)>> {
    self.inner.list_upcoming_sessions(now).await
  }

  async fn count_paid(&self, session_id: Uuid) -> BookingResult<i64> {
    self.inner.count_paid(session_id).await
  }

  async fn insert_booking(&self, booking: &Booking) -> BookingResult<()> {
    self.inner.insert_booking(booking).await
  }

  async fn void_booking(&self, booking_id: Uuid) -> BookingResult<bool> {
    self.inner.void_booking(booking_id).await
  }

  async fn attach_checkout_handle(&self, booking_id: Uuid, handle: &str) -> BookingResult<()> {
    self.inner.attach_checkout_handle(booking_id, handle).await
  }

  async fn get_booking(&self, booking_id: Uuid) -> BookingResult<Option<Booking>> {
    self.inner.get_booking(booking_id).await
  }

  async fn find_by_manage_token(&self, token: &str) -> BookingResult<Option<Booking>> {
    self.inner.find_by_manage_token(token).await
  }

  async fn find_by_checkout_handle(&self, handle: &str) -> BookingResult<Option<Booking>> {
    self.inner.find_by_checkout_handle(handle).await
  }

  async fn find_by_payment_handle(&self, handle: &str) -> BookingResult<Option<Booking>> {
    self.inner.find_by_payment_handle(handle).await
  }

  async fn transition(
    &self,
    booking_id: Uuid,
    from: &[BookingStatus],
    to: BookingStatus,
    effect: TransitionEffect,
  ) -> BookingResult<TransitionOutcome> {
    self.inner.transition(booking_id, from, to, effect).await
  }

  async fn has_payment_event(&self, event_id: &str) -> BookingResult<bool> {
    self.inner.has_payment_event(event_id).await
  }

  async fn apply_payment_event(&self, command: &PaymentEventCommand) -> BookingResult<PaymentApplication> {
    if self.down.load(Ordering::SeqCst) {
      return Err(BookingError::storage(anyhow::anyhow!("connection reset by peer")));
    }
    self.inner.apply_payment_event(command).await
  }

  async fn payment_events_for_booking(&self, booking_id: Uuid) -> BookingResult<Vec<PaymentEventRecord>> {
    self.inner.payment_events_for_booking(booking_id).await
  }

  async fn list_for_owner(&self, owner_id: Uuid) -> BookingResult<Vec<Booking>> {
    self.inner.list_for_owner(owner_id).await
  }

  async fn claim_by_email(&self, owner_id: Uuid, email: &str) -> BookingResult<Vec<Uuid>> {
    self.inner.claim_by_email(owner_id, email).await
  }

  async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> BookingResult<Vec<Uuid>> {
    self.inner.list_pending_created_before(cutoff).await
  }

  async fn list_refund_reviews(&self) -> BookingResult<Vec<RefundReview>> {
    self.inner.list_refund_reviews().await
  }
}

pub fn test_config() -> AppConfig {
  let vars = [
    ("DATABASE_URL", "postgres://unused/for-memory-store"),
    ("SITE_URL", "https://studio.test"),
    ("STRIPE_SECRET_KEY", "sk_test_unused"),
    ("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET),
    ("STATUS_POLL_ATTEMPTS", "1"),
  ];
  AppConfig::from_lookup(|name| vars.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string()))
    .expect("test config")
}

pub struct TestState {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub processor: Arc<StubProcessor>,
}

impl TestState {
  pub fn new() -> Self {
    let store = Arc::new(MemoryStore::new());
    Self::over(store.clone(), store)
  }

  /// Services run over a store that can lose its database; `store` still
  /// reads the underlying rows.
  pub fn with_outage() -> (Self, Arc<StorageOutage>) {
    let store = Arc::new(MemoryStore::new());
    let outage = Arc::new(StorageOutage::new(store.clone()));
    (Self::over(outage.clone(), store), outage)
  }

  fn over(backing: Arc<dyn BookingStore>, store: Arc<MemoryStore>) -> Self {
    setup_tracing();
    let config = Arc::new(test_config());
    let processor = Arc::new(StubProcessor::default());
    let services = studio_booking_server::build_services(backing, processor.clone(), &config).expect("services");
    Self {
      state: AppState {
        services: Arc::new(services),
        config,
        db_pool: None,
      },
      store,
      processor,
    }
  }

  pub async fn add_session(&self, capacity: Option<i32>) -> Session {
    let starts_at = Utc::now() + Duration::days(3);
    let session = Session {
      id: Uuid::new_v4(),
      title: "Evening Yin".into(),
      description: Some("Slow, floor-based practice".into()),
      location: Some("Studio A".into()),
      starts_at,
      ends_at: starts_at + Duration::minutes(75),
      price: 1800,
      currency: "eur".into(),
      capacity,
      active: true,
      created_at: Utc::now() - Duration::days(10),
    };
    self.store.insert_session(&session).await.expect("insert session");
    session
  }
}

/// Signs `body` the way the processor does, timestamped now.
pub fn signature_for(body: &[u8]) -> String {
  SignatureVerifier::new(WEBHOOK_SECRET, std::time::Duration::from_secs(300))
    .sign(body, Utc::now().timestamp())
    .expect("sign")
}

pub fn checkout_completed(event_id: &str, booking_id: &str, handle: &str) -> Vec<u8> {
  serde_json::to_vec(&json!({
    "id": event_id,
    "type": "checkout.session.completed",
    "data": { "object": {
      "id": handle,
      "object": "checkout.session",
      "payment_status": "paid",
      "payment_intent": format!("pi_for_{}", handle),
      "amount_total": 1800,
      "currency": "eur",
      "metadata": { "booking_id": booking_id }
    }}
  }))
  .expect("event json")
}

pub fn field<'a>(value: &'a Value, key: &str) -> &'a str {
  value[key].as_str().unwrap_or_default()
}
