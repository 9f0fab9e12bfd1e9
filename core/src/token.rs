// studio_booking/src/token.rs

//! Opaque per-booking management tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use constant_time_eq::constant_time_eq;
use rand_core::{OsRng, RngCore};

/// 256 bits from the OS generator.
pub const TOKEN_BYTES: usize = 32;

pub fn issue_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// Cheap shape check done before any lookup.
pub fn is_well_formed(token: &str) -> bool {
  matches!(URL_SAFE_NO_PAD.decode(token), Ok(bytes) if bytes.len() == TOKEN_BYTES)
}

pub fn tokens_match(stored: &str, presented: &str) -> bool {
  constant_time_eq(stored.as_bytes(), presented.as_bytes())
}
