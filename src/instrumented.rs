//! Instrumented node wrapper for automatic tracing and metrics.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, error};

use crate::step::{Node, NodeOutput, StepId};
use crate::{ExecutionContext, Result, WorkflowEvent, WorkflowState};

/// Wraps any node with automatic event emission and metric recording.
///
/// For each execution, `InstrumentedNode` emits:
/// - A [`WorkflowEvent::StepStart`] before the inner node runs
/// - A [`WorkflowEvent::StepEnd`] with elapsed milliseconds on success
/// - A [`WorkflowEvent::Error`] and failure metric on error
///
/// [`GraphBuilder::node`](crate::GraphBuilder::node) wraps every handler it
/// registers.
///
/// # Example
///
/// ```rust
/// use leave_workflow::{ExecutionContext, InstrumentedNode, Node, ProcessLeaveNode, StepId, WorkflowState};
///
/// # tokio_test::block_on(async {
/// let node = InstrumentedNode::new(ProcessLeaveNode, StepId::ProcessLeave);
/// let ctx = ExecutionContext::new();
///
/// // Unclassified state: the node fails, and the failure is recorded.
/// let result = node.run(&ctx, &WorkflowState::new("ana", "text")).await;
/// assert!(result.is_err());
/// assert_eq!(ctx.trace_snapshot().len(), 2); // StepStart + Error
/// assert!(ctx.snapshot().has_failures());
/// # });
/// ```
pub struct InstrumentedNode<N> {
    inner: N,
    step: StepId,
}

impl<N: Node> InstrumentedNode<N> {
    /// Wrap `inner` with instrumentation, labelling it `step`.
    pub fn new(inner: N, step: StepId) -> Self {
        Self { inner, step }
    }
}

#[async_trait]
impl<N: Node> Node for InstrumentedNode<N> {
    async fn run(&self, ctx: &ExecutionContext, state: &WorkflowState) -> Result<NodeOutput> {
        ctx.emit(WorkflowEvent::StepStart { step: self.step });
        debug!(step = %self.step, "step started");

        let start = Instant::now();
        let result = self.inner.run(ctx, state).await;
        let duration_ms = start.elapsed().as_millis();

        match &result {
            Ok(_) => {
                ctx.record_step();
                ctx.emit(WorkflowEvent::StepEnd {
                    step: self.step,
                    duration_ms,
                });
                debug!(step = %self.step, duration_ms = duration_ms as u64, "step finished");
            }
            Err(e) => {
                ctx.record_failure(e.to_string());
                ctx.emit(WorkflowEvent::Error {
                    step: self.step,
                    message: e.to_string(),
                });
                error!(step = %self.step, error = %e, "step failed");
            }
        }

        result
    }

    fn name(&self) -> &str {
        self.step.as_str()
    }
}
