// studio_booking_server/src/db/seed.rs

//! Demo sessions for a fresh database. Ids are fixed so reseeding updates
//! the same rows.

use chrono::{DateTime, Duration, Utc};
use studio_booking::{BookingResult, BookingStore, Session};
use uuid::Uuid;

struct DemoSession {
  id: u128,
  title: &'static str,
  location: Option<&'static str>,
  days_ahead: i64,
  hour: u32,
  minutes: i64,
  price: i64,
  capacity: Option<i32>,
}

const DEMO_SESSIONS: [DemoSession; 4] = [
  DemoSession {
    id: 0x5e55_0000_0000_4000_8000_0000_0000_0001,
    title: "Morning Vinyasa",
    location: Some("Studio A"),
    days_ahead: 1,
    hour: 7,
    minutes: 60,
    price: 1800,
    capacity: Some(12),
  },
  DemoSession {
    id: 0x5e55_0000_0000_4000_8000_0000_0000_0002,
    title: "Lunchtime Pilates",
    location: Some("Studio B"),
    days_ahead: 2,
    hour: 12,
    minutes: 45,
    price: 1500,
    capacity: Some(8),
  },
  DemoSession {
    id: 0x5e55_0000_0000_4000_8000_0000_0000_0003,
    title: "Private Reformer",
    location: Some("Reformer Room"),
    days_ahead: 3,
    hour: 18,
    minutes: 50,
    price: 6500,
    capacity: Some(1),
  },
  DemoSession {
    id: 0x5e55_0000_0000_4000_8000_0000_0000_0004,
    title: "Open Meditation",
    location: None,
    days_ahead: 4,
    hour: 19,
    minutes: 30,
    price: 500,
    capacity: None,
  },
];

pub fn demo_sessions(now: DateTime<Utc>) -> Vec<Session> {
  let midnight = now
    .date_naive()
    .and_hms_opt(0, 0, 0)
    .map(|naive| naive.and_utc())
    .unwrap_or(now);
  DEMO_SESSIONS
    .iter()
    .map(|demo| {
      let starts_at = midnight + Duration::days(demo.days_ahead) + Duration::hours(i64::from(demo.hour));
      Session {
        id: Uuid::from_u128(demo.id),
        title: demo.title.to_string(),
        description: None,
        location: demo.location.map(str::to_string),
        starts_at,
        ends_at: starts_at + Duration::minutes(demo.minutes),
        price: demo.price,
        currency: "eur".to_string(),
        capacity: demo.capacity,
        active: true,
        created_at: now,
      }
    })
    .collect()
}

pub async fn seed_sessions(store: &dyn BookingStore, now: DateTime<Utc>) -> BookingResult<usize> {
  let sessions = demo_sessions(now);
  for session in &sessions {
    store.insert_session(session).await?;
  }
  tracing::info!(count = sessions.len(), "Seeded demo sessions.");
  Ok(sessions.len())
}

#[cfg(test)]
mod tests {
  use super::*;
  use studio_booking::MemoryStore;

  #[tokio::test]
  async fn demo_sessions_are_upcoming_and_reseeding_is_stable() {
    let store = MemoryStore::new();
    let now = Utc::now();
    assert_eq!(seed_sessions(&store, now).await.unwrap(), DEMO_SESSIONS.len());
    seed_sessions(&store, now).await.unwrap();

    let upcoming = store.list_upcoming_sessions(now).await.unwrap();
    assert_eq!(upcoming.len(), DEMO_SESSIONS.len());
    assert!(upcoming.iter().all(|(s, paid)| s.starts_at > now && *paid == 0));
  }
}
