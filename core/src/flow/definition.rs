// studio_booking/src/flow/definition.rs

//! The `Flow<T, Err>` struct and the methods used to declare its steps and
//! register handlers.

use super::control::FlowControl;
use super::data::FlowData;
use super::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed async step handler.
pub type StepHandler<T, Err> =
  Box<dyn Fn(FlowData<T>) -> Pin<Box<dyn Future<Output = Result<FlowControl, Err>> + Send>> + Send + Sync>;

/// An ordered list of named steps over flow data `T`.
///
/// `Err` is what handlers return; it must absorb `FlowError` so that
/// configuration failures found during `run` share the caller's error type.
pub struct Flow<T, Err>
where
  T: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<T>>,
  pub(crate) on: HashMap<String, Vec<StepHandler<T, Err>>>,
  pub(crate) after: HashMap<String, Vec<StepHandler<T, Err>>>,
}

impl<T, Err> Flow<T, Err>
where
  T: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Declares a flow from `(step_name, optional)` pairs, in execution order.
  pub fn new(name: impl Into<String>, steps: &[(&str, bool)]) -> Self {
    Self {
      name: name.into(),
      steps: steps
        .iter()
        .map(|(step, optional)| StepDef {
          name: (*step).to_string(),
          optional: *optional,
          skip_if: None,
        })
        .collect(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  // A typo in a step name is a setup bug, not a runtime condition.
  fn step_mut(&mut self, step: &str) -> &mut StepDef<T> {
    let flow_name = self.name.clone();
    self
      .steps
      .iter_mut()
      .find(|s| s.name == step)
      .unwrap_or_else(|| panic!("flow '{}' has no step named '{}'", flow_name, step))
  }

  fn boxed<F, Fut>(handler: F) -> StepHandler<T, Err>
  where
    F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FlowControl, Err>> + Send + 'static,
  {
    Box::new(move |data| Box::pin(handler(data)))
  }

  /// Registers the main handler of a step. Several handlers run in registration order.
  pub fn on_step<F, Fut>(&mut self, step: &str, handler: F) -> &mut Self
  where
    F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FlowControl, Err>> + Send + 'static,
  {
    self.step_mut(step);
    self.on.entry(step.to_string()).or_default().push(Self::boxed(handler));
    self
  }

  /// Registers a handler that runs after all `on` handlers of the step.
  pub fn after_step<F, Fut>(&mut self, step: &str, handler: F) -> &mut Self
  where
    F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FlowControl, Err>> + Send + 'static,
  {
    self.step_mut(step);
    self.after.entry(step.to_string()).or_default().push(Self::boxed(handler));
    self
  }

  pub fn skip_step_if(
    &mut self,
    step: &str,
    condition: impl Fn(&FlowData<T>) -> bool + Send + Sync + 'static,
  ) -> &mut Self {
    let condition: SkipCondition<T> = Arc::new(condition);
    self.step_mut(step).skip_if = Some(condition);
    self
  }
}
