//! Execution context for workflow runs.
//!
//! Each run gets its own `ExecutionContext`; it is passed to every step and
//! collects metrics and a structured event trace for that run only.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::events::{TraceEntry, WorkflowEvent};
use crate::metrics::WorkflowMetrics;
use crate::step::StepId;

/// Context passed to every step in the workflow.
///
/// Cloning is cheap and clones share the same metrics and trace log.
///
/// # Example
///
/// ```rust
/// use leave_workflow::{ExecutionContext, StepId, WorkflowEvent};
///
/// let ctx = ExecutionContext::new();
/// ctx.emit(WorkflowEvent::StepStart { step: StepId::Classify });
///
/// let traces = ctx.trace_snapshot();
/// assert_eq!(traces.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Shared metrics accumulator.
    pub metrics: Arc<Mutex<WorkflowMetrics>>,
    /// Shared trace log for structured workflow events.
    pub traces: Arc<Mutex<Vec<TraceEntry>>>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

// A panicking step must not make the rest of the trace unreadable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ExecutionContext {
    /// Create a new execution context with empty metrics and traces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(Mutex::new(WorkflowMetrics::default())),
            traces: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Increment the steps completed counter.
    pub fn record_step(&self) {
        lock(&self.metrics).record_step();
    }

    /// Count one call to the reasoning collaborator.
    pub fn record_reasoning_call(&self) {
        lock(&self.metrics).record_reasoning_call();
    }

    /// Count one entitlement balance lookup.
    pub fn record_balance_lookup(&self) {
        lock(&self.metrics).record_balance_lookup();
    }

    /// Record a failure message.
    pub fn record_failure(&self, error: impl Into<String>) {
        lock(&self.metrics).record_failure(error.into());
    }

    /// Get a snapshot of the current metrics.
    #[must_use]
    pub fn snapshot(&self) -> WorkflowMetrics {
        lock(&self.metrics).clone()
    }

    /// Emit a structured workflow event to the trace log.
    ///
    /// Events are timestamped automatically when emitted.
    pub fn emit(&self, event: WorkflowEvent) {
        lock(&self.traces).push(TraceEntry::new(event));
    }

    /// Emit an artifact event with automatic JSON serialization.
    pub fn emit_artifact<T: serde::Serialize>(&self, step: StepId, key: &str, data: &T) {
        let data = serde_json::to_value(data)
            .unwrap_or_else(|_| serde_json::json!("<serialization_error>"));
        self.emit(WorkflowEvent::Artifact {
            step,
            key: key.to_string(),
            data,
        });
    }

    /// Get a snapshot of the current trace log.
    #[must_use]
    pub fn trace_snapshot(&self) -> Vec<TraceEntry> {
        lock(&self.traces).clone()
    }

    /// The routing decisions taken so far, in order, as `(from, to)` pairs.
    #[must_use]
    pub fn route_trail(&self) -> Vec<(StepId, Option<StepId>)> {
        lock(&self.traces)
            .iter()
            .filter_map(|entry| match entry.event {
                WorkflowEvent::Routed { from, to } => Some((from, to)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_metrics() {
        let ctx = ExecutionContext::new();
        let other = ctx.clone();
        other.record_step();
        other.record_reasoning_call();
        let m = ctx.snapshot();
        assert_eq!(m.steps_completed, 1);
        assert_eq!(m.reasoning_calls, 1);
    }

    #[test]
    fn test_route_trail_filters_routed_events() {
        let ctx = ExecutionContext::new();
        ctx.emit(WorkflowEvent::StepStart { step: StepId::Classify });
        ctx.emit(WorkflowEvent::Routed {
            from: StepId::Classify,
            to: Some(StepId::CheckBalance),
        });
        ctx.emit_artifact(StepId::CheckBalance, "remaining", &10u32);
        ctx.emit(WorkflowEvent::Routed {
            from: StepId::CheckBalance,
            to: Some(StepId::Reject),
        });

        assert_eq!(
            ctx.route_trail(),
            vec![
                (StepId::Classify, Some(StepId::CheckBalance)),
                (StepId::CheckBalance, Some(StepId::Reject)),
            ]
        );
    }
}
