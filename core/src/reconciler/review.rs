// studio_booking/src/reconciler/review.rs

use async_trait::async_trait;
use tracing::{event, Level};

use crate::error::BookingResult;
use crate::model::RefundReview;

/// Called once for every refund review the reconciler queues. An automatic
/// refund through the processor would plug in here.
#[async_trait]
pub trait CapacityLossHandler: Send + Sync + 'static {
  async fn on_refund_review(&self, review: &RefundReview) -> BookingResult<()>;
}

/// Leaves the review in the queue for staff and raises an alert in the logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualRefundReview;

#[async_trait]
impl CapacityLossHandler for ManualRefundReview {
  async fn on_refund_review(&self, review: &RefundReview) -> BookingResult<()> {
    event!(
      target: "refund_review",
      Level::WARN,
      booking_id = %review.booking_id,
      event_id = %review.event_id,
      amount = review.amount,
      currency = %review.currency,
      reason = review.reason.as_str(),
      "Customer paid for a slot they do not hold. Manual refund or contact required."
    );
    Ok(())
  }
}
