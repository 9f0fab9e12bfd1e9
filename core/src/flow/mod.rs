// studio_booking/src/flow/mod.rs

//! A small step-flow engine: ordered, named steps with `on` and `after`
//! handlers operating on shared `FlowData<T>`.
//!
//! The checkout and payment-event flows are built on it. Each step is an
//! async handler that may continue or stop the flow; a handler error aborts
//! the run and is returned to the caller unchanged.

pub mod control;
pub mod data;
pub mod definition;
pub mod execution;
pub mod step;

pub use control::{FlowControl, FlowOutcome};
pub use data::FlowData;
pub use definition::{Flow, StepHandler};
pub use step::{SkipCondition, StepDef};
