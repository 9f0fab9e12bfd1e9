// studio_booking_server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use studio_booking::{BookingConfig, PollPolicy};

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  /// Public origin of the booking site, without a trailing slash.
  pub site_url: String,

  pub stripe_secret_key: String,
  pub stripe_webhook_secret: String,
  pub stripe_api_base: String,

  pub processor_timeout: Duration,
  pub webhook_tolerance: Duration,
  pub pending_hold: Option<chrono::Duration>,
  pub sweep_interval: Duration,
  /// Long-poll budget of the checkout status endpoint.
  pub status_poll_attempts: u32,
  pub status_poll_interval: Duration,

  pub seed_db: bool,
}

// Secrets stay out of logs.
impl fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &"[REDACTED]")
      .field("site_url", &self.site_url)
      .field("stripe_secret_key", &"[REDACTED]")
      .field("stripe_webhook_secret", &"[REDACTED]")
      .field("stripe_api_base", &self.stripe_api_base)
      .field("processor_timeout", &self.processor_timeout)
      .field("webhook_tolerance", &self.webhook_tolerance)
      .field("pending_hold", &self.pending_hold)
      .field("sweep_interval", &self.sweep_interval)
      .field("status_poll_attempts", &self.status_poll_attempts)
      .field("status_poll_interval", &self.status_poll_interval)
      .field("seed_db", &self.seed_db)
      .finish()
  }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source. `from_env` is the
  /// production entry point; tests pass a map.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = parse_var::<u16>("SERVER_PORT", &get_env("SERVER_PORT").unwrap_or_else(|_| "8080".to_string()))?;
    let database_url = get_env("DATABASE_URL")?;
    let site_url = get_env("SITE_URL")?.trim().trim_end_matches('/').to_string();

    let stripe_secret_key = get_env("STRIPE_SECRET_KEY")?;
    let stripe_webhook_secret = get_env("STRIPE_WEBHOOK_SECRET")?;
    let stripe_api_base = get_env("STRIPE_API_BASE")
      .unwrap_or_else(|_| "https://api.stripe.com".to_string())
      .trim_end_matches('/')
      .to_string();

    let processor_timeout = Duration::from_secs(parse_var::<u64>(
      "PROCESSOR_TIMEOUT_SECS",
      &get_env("PROCESSOR_TIMEOUT_SECS").unwrap_or_else(|_| "10".to_string()),
    )?);
    let webhook_tolerance = Duration::from_secs(parse_var::<u64>(
      "WEBHOOK_TOLERANCE_SECS",
      &get_env("WEBHOOK_TOLERANCE_SECS").unwrap_or_else(|_| "300".to_string()),
    )?);
    let pending_hold = match get_env("PENDING_HOLD_MINUTES") {
      Ok(raw) => {
        let minutes = parse_var::<i64>("PENDING_HOLD_MINUTES", &raw)?;
        let hold = chrono::Duration::try_minutes(minutes)
          .ok_or_else(|| AppError::Config(format!("PENDING_HOLD_MINUTES value '{}' is out of range", raw)))?;
        Some(hold)
      }
      Err(_) => None,
    };
    let sweep_interval = Duration::from_secs(parse_var::<u64>(
      "SWEEP_INTERVAL_SECS",
      &get_env("SWEEP_INTERVAL_SECS").unwrap_or_else(|_| "60".to_string()),
    )?);
    if sweep_interval.is_zero() {
      return Err(AppError::Config("SWEEP_INTERVAL_SECS must be positive".to_string()));
    }

    let status_poll_attempts = parse_var::<u32>(
      "STATUS_POLL_ATTEMPTS",
      &get_env("STATUS_POLL_ATTEMPTS").unwrap_or_else(|_| "5".to_string()),
    )?;
    let status_poll_interval = Duration::from_millis(parse_var::<u64>(
      "STATUS_POLL_INTERVAL_MS",
      &get_env("STATUS_POLL_INTERVAL_MS").unwrap_or_else(|_| "1000".to_string()),
    )?);

    let seed_db = parse_var::<bool>("SEED_DB", &get_env("SEED_DB").unwrap_or_else(|_| "false".to_string()))?;

    let config = Self {
      server_host,
      server_port,
      database_url,
      site_url,
      stripe_secret_key,
      stripe_webhook_secret,
      stripe_api_base,
      processor_timeout,
      webhook_tolerance,
      pending_hold,
      sweep_interval,
      status_poll_attempts,
      status_poll_interval,
      seed_db,
    };
    config.booking_config().validate()?;

    tracing::info!("Application configuration loaded successfully.");
    tracing::debug!(config = ?config, "Loaded config details");
    Ok(config)
  }

  /// The slice of configuration the booking core consumes.
  pub fn booking_config(&self) -> BookingConfig {
    let mut booking = BookingConfig::for_site(&self.site_url);
    booking.processor_timeout = self.processor_timeout;
    booking.signature_tolerance = self.webhook_tolerance;
    booking.pending_hold = self.pending_hold;
    booking
  }

  pub fn poll_policy(&self) -> PollPolicy {
    PollPolicy {
      max_attempts: self.status_poll_attempts.max(1),
      interval: self.status_poll_interval,
      backoff_factor: 1.0,
    }
  }
}
