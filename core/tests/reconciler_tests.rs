// tests/reconciler_tests.rs
mod common;

use chrono::{Duration, Utc};
use common::*;
use serde_json::json;
use studio_booking::{
  BookingError, BookingStatus, BookingStore, DiscardReason, PaymentEventKind, ReconcileOutcome, RefundReason,
};
use uuid::Uuid;

#[tokio::test]
async fn success_confirms_pending_booking() {
  let h = Harness::new();
  let session = h.add_session(Some(2), 1800).await;
  let started = h.start_guest(session.id, "ada@example.com").await;

  let outcome = h
    .deliver(&checkout_completed("evt_ok_1", started.booking_id, 1800))
    .await
    .unwrap();
  assert_eq!(
    outcome,
    ReconcileOutcome::Applied {
      booking_id: started.booking_id,
      from: BookingStatus::Pending,
      to: BookingStatus::Paid,
    }
  );

  let booking = h.store.get_booking(started.booking_id).await.unwrap().unwrap();
  assert_eq!(booking.status, BookingStatus::Paid);
  assert!(booking.confirmed_at.is_some());
  assert_eq!(
    booking.payment_handle,
    Some(format!("pi_for_{}", started.booking_id.simple()))
  );

  let records = h.store.payment_events_for_booking(started.booking_id).await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].kind, PaymentEventKind::PaymentSucceeded);
  assert_eq!(records[0].applied_status, BookingStatus::Paid);
  assert_eq!(records[0].amount_observed, Some(1800));
  assert_eq!(records[0].currency_observed.as_deref(), Some("eur"));
}

#[tokio::test]
async fn redelivery_mutates_exactly_once() {
  let h = Harness::new();
  let session = h.add_session(Some(2), 1800).await;
  let started = h.start_guest(session.id, "ada@example.com").await;
  let event = checkout_completed("evt_redeliver", started.booking_id, 1800);

  h.deliver(&event).await.unwrap();
  let confirmed_at = h.store.get_booking(started.booking_id).await.unwrap().unwrap().confirmed_at;

  for _ in 0..5 {
    assert_eq!(h.deliver(&event).await.unwrap(), ReconcileOutcome::Duplicate);
  }

  let booking = h.store.get_booking(started.booking_id).await.unwrap().unwrap();
  assert_eq!(booking.status, BookingStatus::Paid);
  assert_eq!(booking.confirmed_at, confirmed_at);
  assert_eq!(h.store.payment_events_for_booking(started.booking_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn late_failure_never_reverts_a_paid_booking() {
  let h = Harness::new();
  let session = h.add_session(Some(2), 1800).await;
  let started = h.start_guest(session.id, "ada@example.com").await;

  h.deliver(&checkout_completed("evt_paid", started.booking_id, 1800)).await.unwrap();
  let outcome = h.deliver(&payment_failed("evt_failed_late", started.booking_id)).await.unwrap();
  assert_eq!(
    outcome,
    ReconcileOutcome::Unchanged {
      booking_id: started.booking_id,
      current: BookingStatus::Paid,
      review_queued: false,
    }
  );
  assert_eq!(h.status_of(started.booking_id).await, BookingStatus::Paid);

  // The no-op is still recorded so its redelivery is a duplicate.
  assert_eq!(
    h.deliver(&payment_failed("evt_failed_late", started.booking_id)).await.unwrap(),
    ReconcileOutcome::Duplicate
  );
}

#[tokio::test]
async fn failure_cancels_pending_and_refund_follows_paid() {
  let h = Harness::new();
  let session = h.add_session(Some(2), 1800).await;
  let failing = h.start_guest(session.id, "fail@example.com").await;
  let refunding = h.start_guest(session.id, "refund@example.com").await;

  h.deliver(&payment_failed("evt_f", failing.booking_id)).await.unwrap();
  assert_eq!(h.status_of(failing.booking_id).await, BookingStatus::Cancelled);

  // A refund for a booking that never got paid is a no-op.
  h.deliver(&charge_refunded("evt_r0", refunding.booking_id, 1800)).await.unwrap();
  assert_eq!(h.status_of(refunding.booking_id).await, BookingStatus::Pending);

  h.deliver(&checkout_completed("evt_p", refunding.booking_id, 1800)).await.unwrap();
  h.deliver(&charge_refunded("evt_r1", refunding.booking_id, 1800)).await.unwrap();
  assert_eq!(h.status_of(refunding.booking_id).await, BookingStatus::Refunded);
  assert_eq!(h.services.catalog.get_entry(session.id).await.unwrap().remaining, Some(2));
}

#[tokio::test]
async fn declined_card_then_retry_confirms_the_booking() {
  let h = Harness::new();
  let session = h.add_session(Some(1), 1800).await;
  let started = h.start_guest(session.id, "ada@example.com").await;

  let outcome = h.deliver(&card_declined("evt_decline", started.booking_id)).await.unwrap();
  assert_eq!(
    outcome,
    ReconcileOutcome::Ignored {
      event_type: "payment_intent.payment_failed".to_string()
    }
  );
  assert_eq!(h.status_of(started.booking_id).await, BookingStatus::Pending);

  let outcome = h
    .deliver(&checkout_completed("evt_retry_ok", started.booking_id, 1800))
    .await
    .unwrap();
  assert_eq!(
    outcome,
    ReconcileOutcome::Applied {
      booking_id: started.booking_id,
      from: BookingStatus::Pending,
      to: BookingStatus::Paid,
    }
  );
  assert_eq!(h.store.count_paid(session.id).await.unwrap(), 1);
  assert!(h.store.list_refund_reviews().await.unwrap().is_empty());
}

#[tokio::test]
async fn expired_checkout_correlates_by_handle() {
  let h = Harness::new();
  let session = h.add_session(Some(2), 1800).await;
  let started = h.start_guest(session.id, "ada@example.com").await;

  let outcome = h.deliver(&checkout_expired("evt_exp", "cs_test_1")).await.unwrap();
  assert!(matches!(outcome, ReconcileOutcome::Applied { to: BookingStatus::Expired, .. }));
  assert_eq!(h.status_of(started.booking_id).await, BookingStatus::Expired);
}

#[tokio::test]
async fn success_after_cancellation_queues_one_review() {
  let h = Harness::new();
  let session = h.add_session(Some(2), 1800).await;
  let started = h.start_guest(session.id, "ada@example.com").await;
  h.services.ledger.cancel_if_pending(started.booking_id).await.unwrap();

  let outcome = h
    .deliver(&checkout_completed("evt_late_pay", started.booking_id, 1800))
    .await
    .unwrap();
  assert_eq!(
    outcome,
    ReconcileOutcome::Unchanged {
      booking_id: started.booking_id,
      current: BookingStatus::Cancelled,
      review_queued: true,
    }
  );

  // The matching payment_intent event for the same payment adds no second review.
  let intent = json!({
    "id": "evt_late_pi",
    "type": "payment_intent.succeeded",
    "data": { "object": {
      "id": "pi_late",
      "amount_received": 1800,
      "currency": "eur",
      "metadata": { "booking_id": started.booking_id.to_string() }
    }}
  });
  h.deliver(&intent).await.unwrap();

  let reviews = h.store.list_refund_reviews().await.unwrap();
  assert_eq!(reviews.len(), 1);
  assert_eq!(reviews[0].reason, RefundReason::BookingNoLongerHeld);
  assert_eq!(reviews[0].event_id, "evt_late_pay");
  assert_eq!(h.status_of(started.booking_id).await, BookingStatus::Cancelled);
}

#[tokio::test]
async fn uncorrelated_and_unknown_events_are_discarded_without_a_record() {
  let h = Harness::new();
  let no_metadata = json!({
    "id": "evt_orphan",
    "type": "payment_intent.succeeded",
    "data": { "object": { "amount_received": 1800, "metadata": {} } }
  });
  assert_eq!(
    h.deliver(&no_metadata).await.unwrap(),
    ReconcileOutcome::Discarded {
      reason: DiscardReason::MissingCorrelation
    }
  );

  let unmatched_intent = json!({
    "id": "evt_orphan_pi",
    "type": "payment_intent.succeeded",
    "data": { "object": { "id": "pi_orphan", "amount_received": 1800, "metadata": {} } }
  });
  assert_eq!(
    h.deliver(&unmatched_intent).await.unwrap(),
    ReconcileOutcome::Discarded {
      reason: DiscardReason::BookingNotFound
    }
  );

  let unknown = checkout_completed("evt_ghost", Uuid::new_v4(), 1800);
  assert_eq!(
    h.deliver(&unknown).await.unwrap(),
    ReconcileOutcome::Discarded {
      reason: DiscardReason::BookingNotFound
    }
  );
  assert_eq!(h.store.payment_event_count(), 0);
}

#[tokio::test]
async fn refund_without_metadata_correlates_by_payment_handle() {
  let h = Harness::new();
  let session = h.add_session(Some(2), 1800).await;
  let started = h.start_guest(session.id, "ada@example.com").await;
  h.deliver(&checkout_completed("evt_paid_pi", started.booking_id, 1800)).await.unwrap();

  let refund = json!({
    "id": "evt_refund_pi",
    "type": "charge.refunded",
    "data": { "object": {
      "id": "ch_1",
      "payment_intent": format!("pi_for_{}", started.booking_id.simple()),
      "amount_refunded": 1800,
      "currency": "eur",
      "metadata": {}
    }}
  });
  h.deliver(&refund).await.unwrap();
  assert_eq!(h.status_of(started.booking_id).await, BookingStatus::Refunded);
}

#[tokio::test]
async fn unhandled_event_types_are_ignored() {
  let h = Harness::new();
  let event = json!({ "id": "evt_cust", "type": "customer.created", "data": { "object": { "id": "cus_1" } } });
  assert_eq!(
    h.deliver(&event).await.unwrap(),
    ReconcileOutcome::Ignored {
      event_type: "customer.created".to_string()
    }
  );
}

#[tokio::test]
async fn bad_signature_is_rejected_before_any_lookup() {
  let h = Harness::new();
  let session = h.add_session(Some(2), 1800).await;
  let started = h.start_guest(session.id, "ada@example.com").await;
  let (body, signature) = signed(&checkout_completed("evt_forged", started.booking_id, 1800));

  let tampered = signature.replace("v1=", "v1=00");
  let err = h.services.reconciler.receive(&body, &tampered, Utc::now()).await.unwrap_err();
  assert!(matches!(err, BookingError::InvalidSignature(_)));

  let (_, stale) = signed_at(&checkout_completed("evt_forged", started.booking_id, 1800), Utc::now() - Duration::minutes(10));
  let err = h.services.reconciler.receive(&body, &stale, Utc::now()).await.unwrap_err();
  assert!(matches!(err, BookingError::InvalidSignature(_)));

  assert_eq!(h.status_of(started.booking_id).await, BookingStatus::Pending);
  assert_eq!(h.store.payment_event_count(), 0);
}

#[tokio::test]
async fn signed_but_malformed_body_is_rejected() {
  let h = Harness::new();
  let body = br#"{"id":"evt_bad","type":"charge.refunded"}"#.to_vec();
  let verifier = h.services.reconciler.verifier().clone();
  let signature = verifier.sign(&body, Utc::now().timestamp()).unwrap();
  let err = h.services.reconciler.receive(&body, &signature, Utc::now()).await.unwrap_err();
  assert!(matches!(err, BookingError::MalformedEvent(_)));
}

#[tokio::test]
async fn prefilled_events_skip_verification() {
  let h = Harness::new();
  let session = h.add_session(Some(2), 1800).await;
  let started = h.start_guest(session.id, "ada@example.com").await;

  let event = studio_booking::reconciler::PaymentEvent {
    event_id: "evt_internal".to_string(),
    event_type: "payment_intent.succeeded".to_string(),
    kind: PaymentEventKind::PaymentSucceeded,
    booking_id: Some(started.booking_id),
    checkout_handle: None,
    payment_handle: Some("pi_internal".to_string()),
    amount: Some(1800),
    currency: Some("eur".to_string()),
  };
  let outcome = h.services.reconciler.reconcile(event, Utc::now()).await.unwrap();
  assert!(matches!(outcome, ReconcileOutcome::Applied { to: BookingStatus::Paid, .. }));
}

/// Capacity 2, three concurrent guests; the third payment loses the race and
/// the first success is redelivered.
#[tokio::test]
async fn two_seat_session_scenario() {
  let h = Harness::new();
  let session = h.add_session(Some(2), 1800).await;
  let b1 = h.start_guest(session.id, "b1@example.com").await;
  let b2 = h.start_guest(session.id, "b2@example.com").await;
  let b3 = h.start_guest(session.id, "b3@example.com").await;

  h.deliver(&checkout_completed("evt_b2", b2.booking_id, 1800)).await.unwrap();
  h.deliver(&checkout_completed("evt_b1", b1.booking_id, 1800)).await.unwrap();
  assert_eq!(h.services.catalog.get_entry(session.id).await.unwrap().remaining, Some(0));

  let outcome = h.deliver(&checkout_completed("evt_b3", b3.booking_id, 1800)).await.unwrap();
  assert_eq!(outcome, ReconcileOutcome::CapacityLost { booking_id: b3.booking_id });
  assert_eq!(h.status_of(b3.booking_id).await, BookingStatus::Cancelled);

  let reviews = h.store.list_refund_reviews().await.unwrap();
  assert_eq!(reviews.len(), 1);
  assert_eq!(reviews[0].booking_id, b3.booking_id);
  assert_eq!(reviews[0].reason, RefundReason::CapacityExhausted);
  assert_eq!((reviews[0].amount, reviews[0].currency.as_str()), (1800, "eur"));

  let events_before = h.store.payment_event_count();
  assert_eq!(
    h.deliver(&checkout_completed("evt_b1", b1.booking_id, 1800)).await.unwrap(),
    ReconcileOutcome::Duplicate
  );
  assert_eq!(h.store.payment_event_count(), events_before);
  assert_eq!(h.status_of(b1.booking_id).await, BookingStatus::Paid);
  assert_eq!(h.status_of(b2.booking_id).await, BookingStatus::Paid);
}
