// harvesthub/core/src/flow/step.rs

use super::context::FlowContext;
use super::control::StepControl;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Runs a step. Handlers receive a clone of the shared context.
pub type StepHandler<T, E> = Box<dyn Fn(FlowContext<T>) -> BoxedFuture<Result<StepControl, E>> + Send + Sync>;

/// Undoes the effects of a step that already completed.
pub type Compensator<T, E> = Box<dyn Fn(FlowContext<T>) -> BoxedFuture<Result<(), E>> + Send + Sync>;

/// Evaluated before a step runs. `true` skips the step.
pub type SkipCondition<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct StepDef<T: Send + Sync + 'static> {
  pub name: String,
  /// A failing optional step is logged and the flow moves on.
  pub optional: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: Send + Sync + 'static> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
