// studio_booking/src/lib.rs

//! Booking-payment reconciliation core of a studio booking site.
//!
//! Turns an intent to book a class session into a capacity-safe,
//! exactly-once-confirmed reservation over an at-least-once payment
//! notification channel:
//!  - Session Catalog with derived remaining capacity.
//!  - Booking Ledger with a forward-only status machine.
//!  - Capacity Guard evaluated at intake and, authoritatively, at confirmation.
//!  - Checkout Intent Issuer and Payment Event Reconciler, both built as step flows.
//!  - Access tokens for guest self-service and claim-by-email.

pub mod access;
pub mod capacity;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod flow;
pub mod ledger;
pub mod model;
pub mod poll;
pub mod processor;
pub mod reconciler;
pub mod services;
pub mod store;
pub mod sweeper;
pub mod token;

pub use crate::access::{AccessService, CancelOutcome, ManageAction, ManagedBooking};
pub use crate::catalog::{CatalogEntry, SessionCatalog};
pub use crate::checkout::{CheckoutIssuer, CheckoutStart, CheckoutStarted};
pub use crate::config::{BookingConfig, MIN_PENDING_HOLD_MINUTES};
pub use crate::error::{BookingError, BookingResult, FlowError, NotBookableReason, ProcessorError};
pub use crate::flow::{Flow, FlowControl, FlowData, FlowOutcome};
pub use crate::ledger::BookingLedger;
pub use crate::model::{
  Booking, BookingStatus, Contact, PaymentEventKind, PaymentEventRecord, RefundReason, RefundReview, Session,
};
pub use crate::poll::{ConfirmationPoller, PollPolicy, PollResult};
pub use crate::processor::{CheckoutHandle, CheckoutRequest, PaymentProcessor};
pub use crate::reconciler::{
  CapacityLossHandler, DiscardReason, ManualRefundReview, ReconcileOutcome, Reconciler, SignatureVerifier,
};
pub use crate::services::BookingServices;
pub use crate::store::{BookingStore, MemoryStore, PaymentApplication, PaymentEventCommand, TransitionEffect, TransitionOutcome};
pub use crate::sweeper::{PendingSweeper, SweepReport};

pub mod prelude {
  pub use crate::error::{BookingError, BookingResult};
  pub use crate::flow::{Flow, FlowControl, FlowData, FlowOutcome};
  pub use crate::model::{Booking, BookingStatus, Session};
  pub use crate::services::BookingServices;
  pub use crate::store::BookingStore;
}
