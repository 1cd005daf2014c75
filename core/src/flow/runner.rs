// harvesthub/core/src/flow/runner.rs

use super::context::FlowContext;
use super::control::{FlowOutcome, StepControl};
use super::step::{BoxedFuture, Compensator, SkipCondition, StepDef, StepHandler};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{event, info_span, instrument, Instrument, Level};

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for required step '{step_name}' in flow '{flow}'")]
  HandlerMissing { flow: String, step_name: String },

  #[error("Flow '{flow}' finished without producing a result")]
  Incomplete { flow: String },
}

/// An ordered list of named steps with one handler and an optional
/// compensator per step.
///
/// `E` is the error type returned by handlers; setup problems found while
/// running are converted into it through `From<FlowError>`.
pub struct Flow<T, E>
where
  T: Send + Sync + 'static,
  E: From<FlowError> + std::fmt::Display + Send + 'static,
{
  name: String,
  steps: Vec<StepDef<T>>,
  handlers: HashMap<String, StepHandler<T, E>>,
  compensators: HashMap<String, Compensator<T, E>>,
}

impl<T, E> Flow<T, E>
where
  T: Send + Sync + 'static,
  E: From<FlowError> + std::fmt::Display + Send + 'static,
{
  pub fn new(name: &str, step_defs: &[(&str, bool, Option<SkipCondition<T>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, optional, skip_if)| StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name: name.to_string(),
      steps,
      handlers: HashMap::new(),
      compensators: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      // Wiring mistake at construction time, not a runtime condition.
      panic!("Flow '{}' has no step named '{}'", self.name, step_name);
    }
  }

  /// Registers the handler for `step_name`, replacing any previous one.
  pub fn on<F>(&mut self, step_name: &str, handler: F) -> &mut Self
  where
    F: Fn(FlowContext<T>) -> BoxedFuture<Result<StepControl, E>> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    self.handlers.insert(step_name.to_string(), Box::new(handler));
    self
  }

  /// Registers the undo action for `step_name`. It runs only if the step
  /// completed and a later required step failed.
  pub fn compensate<F>(&mut self, step_name: &str, compensator: F) -> &mut Self
  where
    F: Fn(FlowContext<T>) -> BoxedFuture<Result<(), E>> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    self.compensators.insert(step_name.to_string(), Box::new(compensator));
    self
  }

  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(flow = %self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: FlowContext<T>) -> Result<FlowOutcome, E> {
    let mut completed: Vec<&str> = Vec::with_capacity(self.steps.len());

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let span = info_span!("flow_step", step_name, step_index = step_idx, optional = step_def.optional);

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(&ctx.read()) {
          event!(parent: &span, Level::DEBUG, "Step skipped by condition.");
          continue;
        }
      }

      let Some(handler) = self.handlers.get(step_name) else {
        if step_def.optional {
          event!(parent: &span, Level::DEBUG, "Optional step has no handler, skipping.");
          continue;
        }
        let err = E::from(FlowError::HandlerMissing {
          flow: self.name.clone(),
          step_name: step_name.to_string(),
        });
        self.unwind(&completed, &ctx).await;
        return Err(err);
      };

      match handler(ctx.clone()).instrument(span.clone()).await {
        Ok(StepControl::Continue) => completed.push(step_name),
        Ok(StepControl::Stop) => {
          event!(parent: &span, Level::INFO, "Flow stopped by step.");
          return Ok(FlowOutcome::Stopped);
        }
        Err(e) if step_def.optional => {
          event!(parent: &span, Level::WARN, error = %e, "Optional step failed, continuing.");
        }
        Err(e) => {
          event!(parent: &span, Level::ERROR, error = %e, "Required step failed, compensating.");
          self.unwind(&completed, &ctx).await;
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, "Flow completed.");
    Ok(FlowOutcome::Completed)
  }

  /// Runs compensators for `completed` in reverse order. Compensation
  /// failures are logged and do not stop the remaining compensators.
  async fn unwind(&self, completed: &[&str], ctx: &FlowContext<T>) {
    for step_name in completed.iter().rev() {
      let Some(compensator) = self.compensators.get(*step_name) else {
        continue;
      };
      let span = info_span!("flow_compensation", step_name = *step_name);
      if let Err(e) = compensator(ctx.clone()).instrument(span.clone()).await {
        event!(parent: &span, Level::ERROR, error = %e, "Compensation failed.");
      }
    }
  }
}

impl<T, E> std::fmt::Debug for Flow<T, E>
where
  T: Send + Sync + 'static,
  E: From<FlowError> + std::fmt::Display + Send + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Flow")
      .field("name", &self.name)
      .field("steps", &self.steps)
      .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
      .field("compensators", &self.compensators.keys().collect::<Vec<_>>())
      .finish()
  }
}
