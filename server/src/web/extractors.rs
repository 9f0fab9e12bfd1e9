// studio_booking_server/src/web/extractors.rs

//! Identity set by the trusted auth layer in front of this service.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub email: Option<String>,
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
  req
    .headers()
    .get(name)
    .and_then(|value| value.to_str().ok())
    .map(str::trim)
    .filter(|value| !value.is_empty())
}

fn identify(req: &HttpRequest) -> Result<Option<AuthenticatedUser>, AppError> {
  let Some(raw_id) = header(req, USER_ID_HEADER) else {
    return Ok(None);
  };
  let user_id = Uuid::parse_str(raw_id).map_err(|_| AppError::Auth("Invalid user identity".to_string()))?;
  Ok(Some(AuthenticatedUser {
    user_id,
    email: header(req, USER_EMAIL_HEADER).map(str::to_string),
  }))
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let user = identify(req).and_then(|user| {
      user.ok_or_else(|| AppError::Auth("Missing or invalid user identity".to_string()))
    });
    ready(user)
  }
}

/// Signed-in customer if present; guests get `None`. A malformed identity
/// header is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl FromRequest for MaybeUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(identify(req).map(MaybeUser))
  }
}
