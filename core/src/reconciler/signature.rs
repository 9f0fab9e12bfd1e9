// studio_booking/src/reconciler/signature.rs

//! Stripe-style webhook signatures:
//! `t=<unix seconds>,v1=<hex hmac-sha256 of "{t}.{body}">`, several `v1` allowed.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use tracing::{event, Level};

use crate::error::{BookingError, BookingResult};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct SignatureVerifier {
  secret: Vec<u8>,
  tolerance: Duration,
}

impl fmt::Debug for SignatureVerifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SignatureVerifier")
      .field("secret", &"<redacted>")
      .field("tolerance", &self.tolerance)
      .finish()
  }
}

struct SignatureHeader {
  timestamp: i64,
  signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> BookingResult<SignatureHeader> {
  let mut timestamp = None;
  let mut signatures = Vec::new();
  for part in header.split(',') {
    match part.trim().split_once('=') {
      Some(("t", value)) => {
        timestamp = Some(
          value
            .parse::<i64>()
            .map_err(|_| BookingError::InvalidSignature("timestamp is not a number".into()))?,
        );
      }
      // Undecodable entries are ignored like unknown schemes; one valid v1 is enough.
      Some(("v1", value)) => {
        if let Ok(bytes) = hex::decode(value) {
          signatures.push(bytes);
        }
      }
      _ => {}
    }
  }
  let timestamp = timestamp.ok_or_else(|| BookingError::InvalidSignature("missing timestamp".into()))?;
  if signatures.is_empty() {
    return Err(BookingError::InvalidSignature("missing v1 signature".into()));
  }
  Ok(SignatureHeader { timestamp, signatures })
}

impl SignatureVerifier {
  pub fn new(secret: impl AsRef<[u8]>, tolerance: Duration) -> Self {
    Self {
      secret: secret.as_ref().to_vec(),
      tolerance,
    }
  }

  fn mac(&self, timestamp: i64, payload: &[u8]) -> BookingResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(&self.secret)
      .map_err(|e| BookingError::Config(format!("unusable webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
  }

  /// Checks authenticity and freshness of a raw webhook body. Runs before any parsing.
  pub fn verify(&self, payload: &[u8], header: &str, now: DateTime<Utc>) -> BookingResult<()> {
    let result = self.check(payload, header, now);
    if let Err(e) = &result {
      event!(target: "security", Level::WARN, error = %e, "Rejected webhook with an invalid signature.");
    }
    result
  }

  fn check(&self, payload: &[u8], header: &str, now: DateTime<Utc>) -> BookingResult<()> {
    let parsed = parse_header(header)?;
    let age = now.timestamp().abs_diff(parsed.timestamp);
    if age > self.tolerance.as_secs() {
      return Err(BookingError::InvalidSignature(format!(
        "timestamp outside the {}s tolerance",
        self.tolerance.as_secs()
      )));
    }
    let mac = self.mac(parsed.timestamp, payload)?;
    // verify_slice compares in constant time.
    if parsed
      .signatures
      .iter()
      .any(|candidate| mac.clone().verify_slice(candidate).is_ok())
    {
      Ok(())
    } else {
      Err(BookingError::InvalidSignature("no matching v1 signature".into()))
    }
  }

  /// Produces a header value for `payload`, as the processor would.
  pub fn sign(&self, payload: &[u8], timestamp: i64) -> BookingResult<String> {
    let tag = self.mac(timestamp, payload)?.finalize().into_bytes();
    Ok(format!("t={},v1={}", timestamp, hex::encode(tag)))
  }
}
