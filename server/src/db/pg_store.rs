// studio_booking_server/src/db/pg_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use studio_booking::capacity::{can_confirm, plan_payment, requires_seat, PaymentPlan};
use studio_booking::store::refund_review;
use studio_booking::{
  Booking, BookingError, BookingResult, BookingStatus, BookingStore, PaymentApplication, PaymentEventCommand,
  PaymentEventRecord, RefundReason, RefundReview, Session, TransitionEffect, TransitionOutcome,
};
use tracing::{event, instrument, Level};
use uuid::Uuid;

use super::models::{BookingRow, PaymentEventRow, RefundReviewRow, SessionRow, UpcomingSessionRow};

fn db(err: sqlx::Error) -> BookingError {
  BookingError::storage(err)
}

fn bookings(rows: Vec<BookingRow>) -> BookingResult<Vec<Booking>> {
  rows.into_iter().map(Booking::try_from).collect()
}

/// Postgres-backed store. Each trait method runs as one statement or one
/// transaction. Payment events lock the booking row first and the session row
/// second, so concurrent confirmations for one session serialise on it.
#[derive(Clone)]
pub struct PgBookingStore {
  pool: PgPool,
}

impl PgBookingStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  async fn find_one(&self, sql: &str, key: &str) -> BookingResult<Option<Booking>> {
    sqlx::query_as::<_, BookingRow>(sql)
      .bind(key)
      .fetch_optional(&self.pool)
      .await
      .map_err(db)?
      .map(Booking::try_from)
      .transpose()
  }
}

#[async_trait]
impl BookingStore for PgBookingStore {
  async fn insert_session(&self, session: &Session) -> BookingResult<()> {
    session.validate()?;
    sqlx::query(
      "INSERT INTO sessions (id, title, description, location, starts_at, ends_at, price, currency, capacity, active, created_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
       ON CONFLICT (id) DO UPDATE SET
         title = EXCLUDED.title, description = EXCLUDED.description, location = EXCLUDED.location,
         starts_at = EXCLUDED.starts_at, ends_at = EXCLUDED.ends_at, price = EXCLUDED.price,
         currency = EXCLUDED.currency, capacity = EXCLUDED.capacity, active = EXCLUDED.active",
    )
    .bind(session.id)
    .bind(&session.title)
    .bind(&session.description)
    .bind(&session.location)
    .bind(session.starts_at)
    .bind(session.ends_at)
    .bind(session.price)
    .bind(&session.currency)
    .bind(session.capacity)
    .bind(session.active)
    .bind(session.created_at)
    .execute(&self.pool)
    .await
    .map_err(db)?;
    Ok(())
  }

  async fn get_session(&self, session_id: Uuid) -> BookingResult<Option<Session>> {
    let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1")
      .bind(session_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(db)?;
    Ok(row.map(Session::from))
  }

  async fn list_upcoming_sessions(&self, now: DateTime<Utc>) -> BookingResult<Vec<(Session, i64)>> {
    let rows = sqlx::query_as::<_, UpcomingSessionRow>(
      "SELECT s.*,
              (SELECT COUNT(*) FROM bookings b WHERE b.session_id = s.id AND b.status = 'paid') AS paid_count
       FROM sessions s
       WHERE s.active AND s.starts_at > $1
       ORDER BY s.starts_at",
    )
    .bind(now)
    .fetch_all(&self.pool)
    .await
    .map_err(db)?;
    Ok(rows.into_iter().map(|row| (Session::from(row.session), row.paid_count)).collect())
  }

  async fn count_paid(&self, session_id: Uuid) -> BookingResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE session_id = $1 AND status = 'paid'")
      .bind(session_id)
      .fetch_one(&self.pool)
      .await
      .map_err(db)
  }

  async fn insert_booking(&self, booking: &Booking) -> BookingResult<()> {
    sqlx::query(
      "INSERT INTO bookings (id, session_id, owner_id, contact_name, contact_email, contact_phone, status,
                             amount, currency, checkout_handle, payment_handle, manage_token, created_at, confirmed_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(booking.id)
    .bind(booking.session_id)
    .bind(booking.owner_id)
    .bind(&booking.contact_name)
    .bind(&booking.contact_email)
    .bind(&booking.contact_phone)
    .bind(booking.status.as_str())
    .bind(booking.amount)
    .bind(&booking.currency)
    .bind(&booking.checkout_handle)
    .bind(&booking.payment_handle)
    .bind(&booking.manage_token)
    .bind(booking.created_at)
    .bind(booking.confirmed_at)
    .execute(&self.pool)
    .await
    .map_err(|e| {
      let missing_session = matches!(&e, sqlx::Error::Database(d) if d.is_foreign_key_violation());
      if missing_session {
        BookingError::SessionNotFound {
          session_id: booking.session_id,
        }
      } else {
        db(e)
      }
    })?;
    Ok(())
  }

  async fn void_booking(&self, booking_id: Uuid) -> BookingResult<bool> {
    let result = sqlx::query(
      "DELETE FROM bookings
       WHERE id = $1 AND status = 'pending' AND checkout_handle IS NULL
         AND NOT EXISTS (SELECT 1 FROM payment_events WHERE booking_id = $1)",
    )
    .bind(booking_id)
    .execute(&self.pool)
    .await
    .map_err(db)?;
    Ok(result.rows_affected() > 0)
  }

  async fn attach_checkout_handle(&self, booking_id: Uuid, handle: &str) -> BookingResult<()> {
    let result = sqlx::query("UPDATE bookings SET checkout_handle = $2 WHERE id = $1")
      .bind(booking_id)
      .bind(handle)
      .execute(&self.pool)
      .await
      .map_err(db)?;
    if result.rows_affected() == 0 {
      return Err(BookingError::BookingNotFound);
    }
    Ok(())
  }

  async fn get_booking(&self, booking_id: Uuid) -> BookingResult<Option<Booking>> {
    sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
      .bind(booking_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(db)?
      .map(Booking::try_from)
      .transpose()
  }

  async fn find_by_manage_token(&self, token: &str) -> BookingResult<Option<Booking>> {
    self.find_one("SELECT * FROM bookings WHERE manage_token = $1", token).await
  }

  async fn find_by_checkout_handle(&self, handle: &str) -> BookingResult<Option<Booking>> {
    self.find_one("SELECT * FROM bookings WHERE checkout_handle = $1", handle).await
  }

  async fn find_by_payment_handle(&self, handle: &str) -> BookingResult<Option<Booking>> {
    self
      .find_one(
        "SELECT * FROM bookings WHERE payment_handle = $1 ORDER BY created_at DESC LIMIT 1",
        handle,
      )
      .await
  }

  #[instrument(skip(self, effect))]
  async fn transition(
    &self,
    booking_id: Uuid,
    from: &[BookingStatus],
    to: BookingStatus,
    effect: TransitionEffect,
  ) -> BookingResult<TransitionOutcome> {
    let mut tx = self.pool.begin().await.map_err(db)?;

    let current = sqlx::query_scalar::<_, String>("SELECT status FROM bookings WHERE id = $1 FOR UPDATE")
      .bind(booking_id)
      .fetch_optional(&mut *tx)
      .await
      .map_err(db)?;
    let Some(current) = current else {
      let _ = tx.rollback().await;
      return Err(BookingError::BookingNotFound);
    };
    let current: BookingStatus = current.parse()?;
    if !from.contains(&current) {
      let _ = tx.rollback().await;
      return Ok(TransitionOutcome::Unchanged { current });
    }

    sqlx::query(
      "UPDATE bookings
       SET status = $2,
           payment_handle = COALESCE($3, payment_handle),
           confirmed_at = COALESCE($4, confirmed_at)
       WHERE id = $1",
    )
    .bind(booking_id)
    .bind(to.as_str())
    .bind(effect.payment_handle)
    .bind(effect.confirmed_at)
    .execute(&mut *tx)
    .await
    .map_err(db)?;

    tx.commit().await.map_err(db)?;
    Ok(TransitionOutcome::Applied { from: current, to })
  }

  async fn has_payment_event(&self, event_id: &str) -> BookingResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM payment_events WHERE event_id = $1)")
      .bind(event_id)
      .fetch_one(&self.pool)
      .await
      .map_err(db)
  }

  #[instrument(skip(self, command), fields(event_id = %command.event_id, booking_id = %command.booking_id))]
  async fn apply_payment_event(&self, command: &PaymentEventCommand) -> BookingResult<PaymentApplication> {
    let mut tx = self.pool.begin().await.map_err(db)?;

    // Redeliveries of one event all queue behind this row lock.
    let booking = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
      .bind(command.booking_id)
      .fetch_optional(&mut *tx)
      .await
      .map_err(db)?;
    let Some(booking) = booking else {
      let _ = tx.rollback().await;
      return Err(BookingError::BookingNotFound);
    };
    let booking = Booking::try_from(booking)?;

    let seen = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM payment_events WHERE event_id = $1)")
      .bind(&command.event_id)
      .fetch_one(&mut *tx)
      .await
      .map_err(db)?;
    if seen {
      let _ = tx.rollback().await;
      return Ok(PaymentApplication::Duplicate);
    }

    let current = booking.status;
    let seat_available = if requires_seat(command.kind, current) {
      // NO KEY UPDATE still serialises confirmations but lets booking inserts
      // take their foreign-key share lock on the session.
      let capacity = sqlx::query_scalar::<_, Option<i32>>(
        "SELECT capacity FROM sessions WHERE id = $1 FOR NO KEY UPDATE",
      )
      .bind(booking.session_id)
      .fetch_one(&mut *tx)
      .await
      .map_err(db)?;
      let paid = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings WHERE session_id = $1 AND status = 'paid'",
      )
      .bind(booking.session_id)
      .fetch_one(&mut *tx)
      .await
      .map_err(db)?;
      can_confirm(capacity, paid)
    } else {
      true
    };

    let plan = plan_payment(command.kind, current, seat_available);
    let (applied_status, pending_review) = match plan {
      PaymentPlan::Advance { to, confirm } => {
        let (handle, confirmed_at) = if confirm {
          (command.payment_handle.clone(), Some(command.received_at))
        } else {
          (None, None)
        };
        sqlx::query(
          "UPDATE bookings
           SET status = $2,
               payment_handle = COALESCE($3, payment_handle),
               confirmed_at = COALESCE($4, confirmed_at)
           WHERE id = $1",
        )
        .bind(booking.id)
        .bind(to.as_str())
        .bind(handle)
        .bind(confirmed_at)
        .execute(&mut *tx)
        .await
        .map_err(db)?;
        (to, None)
      }
      PaymentPlan::LoseRace => {
        sqlx::query(
          "UPDATE bookings SET status = 'cancelled', payment_handle = COALESCE($2, payment_handle) WHERE id = $1",
        )
        .bind(booking.id)
        .bind(&command.payment_handle)
        .execute(&mut *tx)
        .await
        .map_err(db)?;
        (BookingStatus::Cancelled, Some(RefundReason::CapacityExhausted))
      }
      PaymentPlan::Hold { review } => (current, review),
    };

    let recorded = sqlx::query(
      "INSERT INTO payment_events (event_id, booking_id, kind, applied_status, amount_observed, currency_observed, processed_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7)
       ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(&command.event_id)
    .bind(booking.id)
    .bind(command.kind.as_str())
    .bind(applied_status.as_str())
    .bind(command.amount)
    .bind(&command.currency)
    .bind(command.received_at)
    .execute(&mut *tx)
    .await
    .map_err(db)?;
    if recorded.rows_affected() == 0 {
      // Same event id recorded concurrently against another booking.
      let _ = tx.rollback().await;
      return Ok(PaymentApplication::Duplicate);
    }

    let review = match pending_review {
      Some(reason) => {
        let review = refund_review(&booking, command, reason);
        let queued = sqlx::query(
          "INSERT INTO refund_reviews (booking_id, event_id, amount, currency, reason, created_at)
           VALUES ($1, $2, $3, $4, $5, $6)
           ON CONFLICT (booking_id) DO NOTHING",
        )
        .bind(review.booking_id)
        .bind(&review.event_id)
        .bind(review.amount)
        .bind(&review.currency)
        .bind(review.reason.as_str())
        .bind(review.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db)?;
        (queued.rows_affected() > 0).then_some(review)
      }
      None => None,
    };

    tx.commit().await.map_err(db)?;
    event!(Level::DEBUG, status = %applied_status, "Payment event committed.");

    Ok(match plan {
      PaymentPlan::Advance { to, .. } => PaymentApplication::Applied { from: current, to },
      PaymentPlan::LoseRace => PaymentApplication::CapacityLost {
        review: review.unwrap_or_else(|| refund_review(&booking, command, RefundReason::CapacityExhausted)),
      },
      PaymentPlan::Hold { .. } => PaymentApplication::Unchanged { current, review },
    })
  }

  async fn payment_events_for_booking(&self, booking_id: Uuid) -> BookingResult<Vec<PaymentEventRecord>> {
    let rows = sqlx::query_as::<_, PaymentEventRow>(
      "SELECT * FROM payment_events WHERE booking_id = $1 ORDER BY processed_at",
    )
    .bind(booking_id)
    .fetch_all(&self.pool)
    .await
    .map_err(db)?;
    rows.into_iter().map(PaymentEventRecord::try_from).collect()
  }

  async fn list_for_owner(&self, owner_id: Uuid) -> BookingResult<Vec<Booking>> {
    let rows = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE owner_id = $1 ORDER BY created_at DESC")
      .bind(owner_id)
      .fetch_all(&self.pool)
      .await
      .map_err(db)?;
    bookings(rows)
  }

  async fn claim_by_email(&self, owner_id: Uuid, email: &str) -> BookingResult<Vec<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
      "UPDATE bookings SET owner_id = $1
       WHERE owner_id IS NULL AND lower(contact_email) = lower($2)
       RETURNING id",
    )
    .bind(owner_id)
    .bind(email.trim())
    .fetch_all(&self.pool)
    .await
    .map_err(db)
  }

  async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> BookingResult<Vec<Uuid>> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM bookings WHERE status = 'pending' AND created_at < $1")
      .bind(cutoff)
      .fetch_all(&self.pool)
      .await
      .map_err(db)
  }

  async fn list_refund_reviews(&self) -> BookingResult<Vec<RefundReview>> {
    let rows = sqlx::query_as::<_, RefundReviewRow>("SELECT * FROM refund_reviews ORDER BY created_at")
      .fetch_all(&self.pool)
      .await
      .map_err(db)?;
    rows.into_iter().map(RefundReview::try_from).collect()
  }
}
