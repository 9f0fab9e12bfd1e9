// studio_booking/src/services.rs

use std::sync::Arc;

use crate::access::AccessService;
use crate::catalog::SessionCatalog;
use crate::checkout::CheckoutIssuer;
use crate::config::BookingConfig;
use crate::error::BookingResult;
use crate::ledger::BookingLedger;
use crate::poll::{ConfirmationPoller, PollPolicy};
use crate::processor::PaymentProcessor;
use crate::reconciler::{CapacityLossHandler, Reconciler, SignatureVerifier};
use crate::store::BookingStore;
use crate::sweeper::PendingSweeper;

/// Every component of the booking core wired over one store and one processor.
pub struct BookingServices {
  pub store: Arc<dyn BookingStore>,
  pub config: Arc<BookingConfig>,
  pub catalog: SessionCatalog,
  pub ledger: BookingLedger,
  pub access: AccessService,
  pub checkout: CheckoutIssuer,
  pub reconciler: Reconciler,
  pub poller: ConfirmationPoller,
  /// Present only when a pending hold window is configured.
  pub sweeper: Option<PendingSweeper>,
}

impl BookingServices {
  pub fn new(
    store: Arc<dyn BookingStore>,
    processor: Arc<dyn PaymentProcessor>,
    config: BookingConfig,
    webhook_secret: &str,
  ) -> BookingResult<Self> {
    config.validate()?;
    let config = Arc::new(config);
    let catalog = SessionCatalog::new(store.clone());
    let ledger = BookingLedger::new(store.clone());
    let verifier = SignatureVerifier::new(webhook_secret, config.signature_tolerance);
    let sweeper = config
      .pending_hold
      .map(|hold| PendingSweeper::new(ledger.clone(), hold))
      .transpose()?;

    Ok(Self {
      access: AccessService::new(ledger.clone(), catalog.clone()),
      checkout: CheckoutIssuer::new(catalog.clone(), ledger.clone(), processor, config.clone()),
      reconciler: Reconciler::new(store.clone(), verifier),
      poller: ConfirmationPoller::new(ledger.clone(), PollPolicy::default()),
      sweeper,
      catalog,
      ledger,
      config,
      store,
    })
  }

  pub fn with_refund_handler(mut self, handler: Arc<dyn CapacityLossHandler>) -> Self {
    self.reconciler = self.reconciler.with_review_handler(handler);
    self
  }

  pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
    self.poller = ConfirmationPoller::new(self.ledger.clone(), policy);
    self
  }
}
