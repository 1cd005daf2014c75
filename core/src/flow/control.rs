// harvesthub/core/src/flow/control.rs

/// Returned by a step handler to tell the flow what happens next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  Continue,
  /// Halt the flow without error. Completed steps are kept, not compensated.
  Stop,
}

/// How a flow run ended when no step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  Completed,
  Stopped,
}
