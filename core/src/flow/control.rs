// studio_booking/src/flow/control.rs

//! Signals for controlling flow execution and the outcome of a run.

/// Returned by a step handler to continue or halt the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
  /// Run the remaining handlers of this step and the following steps.
  Continue,
  /// Halt the flow. The outcome is already decided and recorded in the flow data.
  Stop,
}

/// Outcome of a full flow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every non-skipped step ran to the end.
  Completed,
  /// A handler of `step` returned `FlowControl::Stop`.
  Stopped { step: String },
}

impl FlowOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, FlowOutcome::Completed)
  }
}
