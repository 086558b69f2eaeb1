//! The workflow engine: drives one application through a [`Graph`].

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::collaborator::{EntitlementLedger, FixedEntitlement, Reasoner};
use crate::graph::{leave_graph, Graph, Next};
use crate::step::Transition;
use crate::{
    Error, ErrorKind, ExecutionContext, LeaveStatus, LeaveType, Result, WorkflowConfig,
    WorkflowEvent, WorkflowMetrics, WorkflowState,
};

/// Runs leave applications through a shared, immutable graph.
///
/// `Workflow` holds no per-run state: every call creates its own
/// [`WorkflowState`] and [`ExecutionContext`], so one instance can serve
/// concurrent requests and several instances can share one graph.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use leave_workflow::{FixedEntitlement, LeaveStatus, LeaveType, StubReasoner, Workflow, WorkflowConfig};
///
/// # tokio_test::block_on(async {
/// let workflow = Workflow::leave(
///     Arc::new(StubReasoner::classifying(LeaveType::Medical, 1)),
///     Arc::new(FixedEntitlement(10)),
///     WorkflowConfig::default(),
/// )
/// .unwrap();
///
/// let (state, metrics) = workflow.run("I need 1 day medical leave tomorrow").await.unwrap();
/// assert_eq!(state.status, LeaveStatus::Approved);
/// assert!(state.reply.is_some());
/// assert_eq!(metrics.steps_completed, 4);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Workflow {
    graph: Arc<Graph>,
    config: Arc<WorkflowConfig>,
}

impl Workflow {
    /// Create a workflow over an already-built graph.
    pub fn new(graph: Arc<Graph>, config: Arc<WorkflowConfig>) -> Self {
        Self { graph, config }
    }

    /// Build the standard leave graph and wrap it.
    pub fn leave(
        reasoner: Arc<dyn Reasoner>,
        ledger: Arc<dyn EntitlementLedger>,
        config: WorkflowConfig,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let graph = leave_graph(reasoner, ledger, config.clone())?;
        Ok(Self::new(Arc::new(graph), config))
    }

    /// Build the standard leave graph with a [`FixedEntitlement`] ledger
    /// reporting `config.default_entitlement` for every applicant.
    pub fn with_fixed_entitlement(reasoner: Arc<dyn Reasoner>, config: WorkflowConfig) -> Result<Self> {
        let ledger = FixedEntitlement(config.default_entitlement);
        Self::leave(reasoner, Arc::new(ledger), config)
    }

    /// Returns the name of this workflow.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Run an application for the configured default applicant.
    pub async fn run(&self, application: impl Into<String>) -> Result<(WorkflowState, WorkflowMetrics)> {
        self.run_for(self.config.default_applicant.clone(), application)
            .await
    }

    /// Run an application, returning the final state and the run's metrics.
    ///
    /// A fresh [`ExecutionContext`] is created for each invocation.
    pub async fn run_for(
        &self,
        applicant: impl Into<String>,
        application: impl Into<String>,
    ) -> Result<(WorkflowState, WorkflowMetrics)> {
        let ctx = ExecutionContext::new();
        let state = WorkflowState::new(applicant, application);
        let state = self.run_with_ctx(&ctx, state).await?;
        Ok((state, ctx.snapshot()))
    }

    /// Drive `state` from the entry step to a terminal step.
    ///
    /// Each step's update is merged before the next edge is resolved. The
    /// first error stops the run; no step is re-entered.
    pub async fn run_with_ctx(
        &self,
        ctx: &ExecutionContext,
        mut state: WorkflowState,
    ) -> Result<WorkflowState> {
        info!(workflow = %self.name(), applicant = %state.applicant, "workflow started");
        let mut current = self.graph.entry();

        // The graph is acyclic, so no run visits more steps than it has.
        for _ in 0..self.graph.len() {
            let node = self
                .graph
                .node(current)
                .ok_or_else(|| Error::routing(current, "step has no registered handler"))?;

            let output = node.run(ctx, &state).await?;
            if let Err(e) = state.apply(output.update) {
                ctx.record_failure(e.to_string());
                warn!(workflow = %self.name(), step = %current, error = %e, "state merge failed");
                return Err(e);
            }
            state.path.push(current);
            if let Transition::Branch(to) = output.transition {
                state.routing_hint = Some(to);
            }

            match self.graph.resolve(current, output.transition) {
                Ok(Next::Step(to)) => {
                    ctx.emit(WorkflowEvent::Routed {
                        from: current,
                        to: Some(to),
                    });
                    current = to;
                }
                Ok(Next::Terminal) => {
                    ctx.emit(WorkflowEvent::Routed {
                        from: current,
                        to: None,
                    });
                    if state.reply.as_deref().map_or(true, |r| r.trim().is_empty()) {
                        let e = Error::StateViolation(format!(
                            "terminal step '{current}' left no reply"
                        ));
                        ctx.record_failure(e.to_string());
                        return Err(e);
                    }
                    info!(
                        workflow = %self.name(),
                        status = %state.status,
                        terminal = %current,
                        "workflow finished"
                    );
                    return Ok(state);
                }
                Err(e) => {
                    ctx.record_failure(e.to_string());
                    warn!(workflow = %self.name(), error = %e, "routing failed");
                    return Err(e);
                }
            }
        }

        Err(Error::routing(current, "run exceeded the number of registered steps"))
    }

    /// Run an application and flatten the outcome into a response payload.
    pub async fn run_workflow(&self, application: impl Into<String>) -> WorkflowResponse {
        let outcome = match self.run(application).await {
            Ok((state, _)) => LeaveDecision::from_state(&state),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(decision) => WorkflowResponse::Decision(decision),
            Err(e) => {
                warn!(workflow = %self.name(), error = %e, "workflow failed");
                WorkflowResponse::Failure(WorkflowFailure::from(&e))
            }
        }
    }

    /// Run independent applications concurrently; responses keep input order.
    pub async fn run_batch<I, S>(&self, applications: I) -> Vec<WorkflowResponse>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        join_all(applications.into_iter().map(|a| self.run_workflow(a))).await
    }
}

/// The fields a caller sees after a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDecision {
    pub status: LeaveStatus,
    pub leave_type: LeaveType,
    pub number_of_leaves: u32,
    pub remaining_leaves: u32,
    pub reply: String,
}

impl LeaveDecision {
    /// Extract the decision from a finished state.
    pub fn from_state(state: &WorkflowState) -> Result<Self> {
        let missing = |field: &str| Error::StateViolation(format!("finished run has no {field}"));
        Ok(Self {
            status: state.status,
            leave_type: state.leave_type.ok_or_else(|| missing("leaveType"))?,
            number_of_leaves: state.number_of_leaves.ok_or_else(|| missing("numberOfLeaves"))?,
            remaining_leaves: state.remaining_leaves.ok_or_else(|| missing("remainingLeaves"))?,
            reply: state.reply.clone().ok_or_else(|| missing("reply"))?,
        })
    }
}

/// The payload a caller sees after a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowFailure {
    pub error: String,
    pub kind: ErrorKind,
}

impl From<&Error> for WorkflowFailure {
    fn from(e: &Error) -> Self {
        Self {
            error: e.to_string(),
            kind: e.kind(),
        }
    }
}

/// Either a decision or an error, never a mix of both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowResponse {
    Decision(LeaveDecision),
    Failure(WorkflowFailure),
}

impl WorkflowResponse {
    pub fn is_failure(&self) -> bool {
        matches!(self, WorkflowResponse::Failure(_))
    }
}
