// studio_booking/src/flow/execution.rs

//! `Flow::run`: executes the steps in order against shared flow data.

use super::control::{FlowControl, FlowOutcome};
use super::data::FlowData;
use super::definition::{Flow, StepHandler};
use crate::error::FlowError;
use tracing::{event, info_span, Instrument, Level};

impl<T, Err> Flow<T, Err>
where
  T: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `data`.
  ///
  /// Returns `Stopped` as soon as a handler asks to stop, or the first handler error.
  pub async fn run(&self, data: FlowData<T>) -> Result<FlowOutcome, Err> {
    event!(Level::DEBUG, flow = %self.name, "Flow execution starting.");

    for (index, step) in self.steps.iter().enumerate() {
      let span = info_span!("flow_step", flow = %self.name, step = %step.name, step_index = index);

      if let Some(skip) = &step.skip_if {
        if skip(&data) {
          event!(parent: &span, Level::DEBUG, "Step skipped by its skip condition.");
          continue;
        }
      }

      let on = self.on.get(&step.name).filter(|h| !h.is_empty());
      let after = self.after.get(&step.name).filter(|h| !h.is_empty());

      if on.is_none() && after.is_none() {
        if step.optional {
          event!(parent: &span, Level::DEBUG, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(parent: &span, Level::ERROR, "Non-optional step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          flow: self.name.clone(),
          step: step.name.clone(),
        }));
      }

      for handlers in [on, after].into_iter().flatten() {
        if run_handlers(handlers, &data).instrument(span.clone()).await? == FlowControl::Stop {
          event!(parent: &span, Level::DEBUG, "Flow stopped by step handler.");
          return Ok(FlowOutcome::Stopped {
            step: step.name.clone(),
          });
        }
      }
    }

    event!(Level::DEBUG, flow = %self.name, "Flow execution completed.");
    Ok(FlowOutcome::Completed)
  }
}

async fn run_handlers<T, Err>(handlers: &[StepHandler<T, Err>], data: &FlowData<T>) -> Result<FlowControl, Err>
where
  T: Send + Sync + 'static,
  Err: std::error::Error + Send + Sync + 'static,
{
  for handler in handlers {
    match handler(data.clone()).await {
      Ok(FlowControl::Continue) => {}
      Ok(FlowControl::Stop) => return Ok(FlowControl::Stop),
      Err(e) => {
        event!(Level::DEBUG, error = %e, "Step handler failed.");
        return Err(e);
      }
    }
  }
  Ok(FlowControl::Continue)
}
