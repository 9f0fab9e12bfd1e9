// studio_booking_server/src/web/handlers/mod.rs

pub mod account_handlers;
pub mod checkout_handlers;
pub mod health_handlers;
pub mod manage_handlers;
pub mod session_handlers;
pub mod webhook_handlers;
