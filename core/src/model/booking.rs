// studio_booking/src/model/booking.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BookingError;

/// Closed set of booking states.
///
/// Legal edges: `pending -> {paid, cancelled, expired}` and `paid -> refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
  Pending,
  Paid,
  Cancelled,
  Expired,
  Refunded,
}

impl BookingStatus {
  pub const ALL: [BookingStatus; 5] = [
    BookingStatus::Pending,
    BookingStatus::Paid,
    BookingStatus::Cancelled,
    BookingStatus::Expired,
    BookingStatus::Refunded,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      BookingStatus::Pending => "pending",
      BookingStatus::Paid => "paid",
      BookingStatus::Cancelled => "cancelled",
      BookingStatus::Expired => "expired",
      BookingStatus::Refunded => "refunded",
    }
  }

  pub fn can_transition_to(self, next: BookingStatus) -> bool {
    use BookingStatus::*;
    matches!(
      (self, next),
      (Pending, Paid) | (Pending, Cancelled) | (Pending, Expired) | (Paid, Refunded)
    )
  }

  /// No edge leaves this state.
  pub fn is_terminal(self) -> bool {
    !Self::ALL.iter().any(|next| self.can_transition_to(*next))
  }
}

impl fmt::Display for BookingStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BookingStatus {
  type Err = BookingError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    BookingStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| BookingError::storage(anyhow::anyhow!("unknown booking status '{}'", s)))
  }
}

/// Normalised contact details of the person booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub name: Option<String>,
  pub email: String,
  pub phone: Option<String>,
}

impl Contact {
  /// Trims every field, lower-cases the email and checks its basic shape.
  pub fn parse(name: Option<&str>, email: &str, phone: Option<&str>) -> Result<Self, BookingError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
      return Err(BookingError::InvalidContact("email is required".to_string()));
    }
    if !is_plausible_email(&email) {
      return Err(BookingError::InvalidContact("invalid email format".to_string()));
    }
    Ok(Self {
      name: non_empty(name),
      email,
      phone: non_empty(phone),
    })
  }
}

fn non_empty(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// `local@domain.tld` with no whitespace, exactly one `@`, and a dot inside the domain.
pub fn is_plausible_email(email: &str) -> bool {
  if email.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  if local.is_empty() || domain.contains('@') || domain.len() < 3 {
    return false;
  }
  domain
    .char_indices()
    .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// One customer's claim on a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
  pub id: Uuid,
  pub session_id: Uuid,
  /// `None` for guest bookings until claimed.
  pub owner_id: Option<Uuid>,
  pub contact_name: Option<String>,
  pub contact_email: String,
  pub contact_phone: Option<String>,
  pub status: BookingStatus,
  /// Captured from the session at creation, never changed afterwards.
  pub amount: i64,
  pub currency: String,
  pub checkout_handle: Option<String>,
  pub payment_handle: Option<String>,
  #[serde(skip_serializing)]
  pub manage_token: String,
  pub created_at: DateTime<Utc>,
  pub confirmed_at: Option<DateTime<Utc>>,
}

impl Booking {
  pub fn is_guest(&self) -> bool {
    self.owner_id.is_none()
  }
}
