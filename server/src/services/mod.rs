// studio_booking_server/src/services/mod.rs

pub mod expiry_task;
pub mod stripe;

pub use stripe::StripeProcessor;
