// harvesthub/core/src/flow/mod.rs

//! A small ordered step runner with compensation.
//!
//! Steps run in declaration order against a shared [`FlowContext`]. When a
//! required step fails, the compensators of every step that already completed
//! run in reverse order before the error is returned, which turns a multi-step
//! operation into an all-or-nothing one.

mod context;
mod control;
mod runner;
mod step;

pub use context::FlowContext;
pub use control::{FlowOutcome, StepControl};
pub use runner::{Flow, FlowError};
pub use step::{BoxedFuture, Compensator, SkipCondition, StepDef, StepHandler};
