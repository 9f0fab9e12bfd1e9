// studio_booking_server/src/db/models.rs

//! Row shapes as they come out of Postgres. Enum columns are stored as text
//! and parsed back into the core types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use studio_booking::{Booking, BookingError, PaymentEventRecord, RefundReview, Session};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
  pub id: Uuid,
  pub title: String,
  pub description: Option<String>,
  pub location: Option<String>,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
  pub price: i64,
  pub currency: String,
  pub capacity: Option<i32>,
  pub active: bool,
  pub created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
  fn from(row: SessionRow) -> Self {
    Session {
      id: row.id,
      title: row.title,
      description: row.description,
      location: row.location,
      starts_at: row.starts_at,
      ends_at: row.ends_at,
      price: row.price,
      currency: row.currency,
      capacity: row.capacity,
      active: row.active,
      created_at: row.created_at,
    }
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct UpcomingSessionRow {
  #[sqlx(flatten)]
  pub session: SessionRow,
  pub paid_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
  pub id: Uuid,
  pub session_id: Uuid,
  pub owner_id: Option<Uuid>,
  pub contact_name: Option<String>,
  pub contact_email: String,
  pub contact_phone: Option<String>,
  pub status: String,
  pub amount: i64,
  pub currency: String,
  pub checkout_handle: Option<String>,
  pub payment_handle: Option<String>,
  pub manage_token: String,
  pub created_at: DateTime<Utc>,
  pub confirmed_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRow> for Booking {
  type Error = BookingError;

  fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
    Ok(Booking {
      id: row.id,
      session_id: row.session_id,
      owner_id: row.owner_id,
      contact_name: row.contact_name,
      contact_email: row.contact_email,
      contact_phone: row.contact_phone,
      status: row.status.parse()?,
      amount: row.amount,
      currency: row.currency,
      checkout_handle: row.checkout_handle,
      payment_handle: row.payment_handle,
      manage_token: row.manage_token,
      created_at: row.created_at,
      confirmed_at: row.confirmed_at,
    })
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentEventRow {
  pub event_id: String,
  pub booking_id: Uuid,
  pub kind: String,
  pub applied_status: String,
  pub amount_observed: Option<i64>,
  pub currency_observed: Option<String>,
  pub processed_at: DateTime<Utc>,
}

impl TryFrom<PaymentEventRow> for PaymentEventRecord {
  type Error = BookingError;

  fn try_from(row: PaymentEventRow) -> Result<Self, Self::Error> {
    Ok(PaymentEventRecord {
      event_id: row.event_id,
      booking_id: row.booking_id,
      kind: row.kind.parse()?,
      applied_status: row.applied_status.parse()?,
      amount_observed: row.amount_observed,
      currency_observed: row.currency_observed,
      processed_at: row.processed_at,
    })
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct RefundReviewRow {
  pub booking_id: Uuid,
  pub event_id: String,
  pub amount: i64,
  pub currency: String,
  pub reason: String,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<RefundReviewRow> for RefundReview {
  type Error = BookingError;

  fn try_from(row: RefundReviewRow) -> Result<Self, Self::Error> {
    Ok(RefundReview {
      booking_id: row.booking_id,
      event_id: row.event_id,
      amount: row.amount,
      currency: row.currency,
      reason: row.reason.parse()?,
      created_at: row.created_at,
    })
  }
}
