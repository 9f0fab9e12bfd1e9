use async_trait::async_trait;
use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;
use studio_booking::{
  BookingConfig, BookingServices, BookingStore, CheckoutHandle, CheckoutRequest, CheckoutStart, MemoryStore,
  PaymentProcessor, ProcessorError, Session,
};
use tokio::runtime::Runtime;
use uuid::Uuid;

const SECRET: &str = "whsec_bench";

struct InstantProcessor;

#[async_trait]
impl PaymentProcessor for InstantProcessor {
  async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutHandle, ProcessorError> {
    Ok(CheckoutHandle {
      id: format!("cs_bench_{}", request.booking_id.simple()),
      url: "https://checkout.bench/pay".to_string(),
    })
  }
}

fn session() -> Session {
  let starts_at = Utc::now() + Duration::days(1);
  Session {
    id: Uuid::new_v4(),
    title: "Bench Class".to_string(),
    description: None,
    location: None,
    starts_at,
    ends_at: starts_at + Duration::hours(1),
    price: 1800,
    currency: "eur".to_string(),
    capacity: None,
    active: true,
    created_at: Utc::now(),
  }
}

// The session still has to be inserted through the store by the caller.
fn services() -> (Arc<BookingServices>, Session) {
  let store = Arc::new(MemoryStore::new());
  let session = session();
  let services = BookingServices::new(
    store,
    Arc::new(InstantProcessor),
    BookingConfig::for_site("https://bench.test"),
    SECRET,
  )
  .unwrap();
  (Arc::new(services), session)
}

fn completed(event_id: &str, booking_id: Uuid) -> Vec<u8> {
  serde_json::to_vec(&json!({
    "id": event_id,
    "type": "checkout.session.completed",
    "data": { "object": {
      "id": "cs_bench",
      "payment_status": "paid",
      "amount_total": 1800,
      "currency": "eur",
      "metadata": { "booking_id": booking_id.to_string() }
    }}
  }))
  .unwrap()
}

// Redelivery is the steady state of an at-least-once channel.
fn bench_duplicate_fast_path(c: &mut Criterion) {
  let mut group = c.benchmark_group("ReconcilerDuplicate");
  let rt = Runtime::new().unwrap();
  let (services, session) = services();
  rt.block_on(services.store.insert_session(&session)).unwrap();
  let session_id = session.id;

  let started = rt
    .block_on(services.checkout.start_checkout(
      CheckoutStart {
        session_id,
        name: None,
        email: "bench@example.com".to_string(),
        phone: None,
        owner_id: None,
      },
      Utc::now(),
    ))
    .unwrap();
  let body = completed("evt_bench_dup", started.booking_id);
  let signature = services.reconciler.verifier().sign(&body, Utc::now().timestamp()).unwrap();
  rt.block_on(services.reconciler.receive(&body, &signature, Utc::now()))
    .unwrap();

  group.throughput(Throughput::Elements(1));
  group.bench_function("signed_redelivery", |b| {
    b.to_async(&rt).iter(|| {
      let services = services.clone();
      let body = body.clone();
      let signature = signature.clone();
      async move { services.reconciler.receive(&body, &signature, Utc::now()).await.unwrap() }
    });
  });
  group.finish();
}

fn bench_checkout_then_confirm(c: &mut Criterion) {
  let mut group = c.benchmark_group("CheckoutThenConfirm");
  let rt = Runtime::new().unwrap();

  for batch in [1usize, 10, 50].iter() {
    group.throughput(Throughput::Elements(*batch as u64));
    group.bench_with_input(BenchmarkId::from_parameter(batch), batch, |b, &batch| {
      b.to_async(&rt).iter_batched(
        services,
        |(services, session)| async move {
          services.store.insert_session(&session).await.unwrap();
          let session_id = session.id;
          for i in 0..batch {
            let started = services
              .checkout
              .start_checkout(
                CheckoutStart {
                  session_id,
                  name: None,
                  email: format!("b{}@example.com", i),
                  phone: None,
                  owner_id: None,
                },
                Utc::now(),
              )
              .await
              .unwrap();
            let body = completed(&format!("evt_{}", i), started.booking_id);
            let signature = services.reconciler.verifier().sign(&body, Utc::now().timestamp()).unwrap();
            services.reconciler.receive(&body, &signature, Utc::now()).await.unwrap();
          }
        },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

criterion_group!(benches, bench_duplicate_fast_path, bench_checkout_then_confirm);
criterion_main!(benches);
