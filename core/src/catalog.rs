// studio_booking/src/catalog.rs

//! Session Catalog: read-only projection of bookable sessions with live
//! remaining counts. Numbers here are advisory.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::capacity::remaining;
use crate::error::{BookingError, BookingResult};
use crate::model::Session;
use crate::store::BookingStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
  #[serde(flatten)]
  pub session: Session,
  /// `None` when the session has no capacity limit.
  pub remaining: Option<i64>,
}

#[derive(Clone)]
pub struct SessionCatalog {
  store: Arc<dyn BookingStore>,
}

impl SessionCatalog {
  pub fn new(store: Arc<dyn BookingStore>) -> Self {
    Self { store }
  }

  /// Active sessions starting after `now`, earliest first.
  pub async fn list_bookable(&self, now: DateTime<Utc>) -> BookingResult<Vec<CatalogEntry>> {
    Ok(
      self
        .store
        .list_upcoming_sessions(now)
        .await?
        .into_iter()
        .map(|(session, paid)| CatalogEntry {
          remaining: remaining(session.capacity, paid),
          session,
        })
        .collect(),
    )
  }

  pub async fn get_by_id(&self, session_id: Uuid) -> BookingResult<Session> {
    self
      .store
      .get_session(session_id)
      .await?
      .ok_or(BookingError::SessionNotFound { session_id })
  }

  pub async fn get_entry(&self, session_id: Uuid) -> BookingResult<CatalogEntry> {
    let session = self.get_by_id(session_id).await?;
    let paid = self.store.count_paid(session_id).await?;
    Ok(CatalogEntry {
      remaining: remaining(session.capacity, paid),
      session,
    })
  }
}
