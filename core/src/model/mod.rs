// studio_booking/src/model/mod.rs

//! Data structures of the booking core: sessions, bookings and the
//! payment-event de-duplication ledger.

pub mod booking;
pub mod payment_event;
pub mod session;

pub use booking::{Booking, BookingStatus, Contact};
pub use payment_event::{PaymentEventKind, PaymentEventRecord, RefundReason, RefundReview};
pub use session::Session;
