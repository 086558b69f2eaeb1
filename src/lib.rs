//! # leave-workflow
//!
//! A small graph-driven workflow engine that takes a free-text leave
//! (time-off) request, classifies it, checks the applicant's balance, routes
//! it to approval, rejection or human review, and produces a reply.
//!
//! Text understanding is delegated to an external [`Reasoner`]; balances come
//! from an [`EntitlementLedger`]. The engine itself only owns control flow.
//!
//! ## Core Concepts
//!
//! - **WorkflowState**: The record threaded through every step, updated by partial merges
//! - **Node**: The trait every step handler implements
//! - **Transition**: How a node leaves: fixed edge, named branch, or end
//! - **Graph / GraphBuilder**: Immutable, validated step registry and edge table
//! - **Workflow**: The engine that drives a state from entry to a terminal step
//! - **ExecutionContext**: Per-run metrics and structured event trace
//! - **InstrumentedNode**: Automatic events and metrics around every step
//!
//! ## Flow
//!
//! ```text
//! classify -> checkBalance -+-> process -+-> approve
//!                           |            +-> humanReview
//!                           +-> reject
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use leave_workflow::{
//!     FixedEntitlement, LeaveStatus, LeaveType, StepId, StubReasoner, Workflow, WorkflowConfig,
//!     WorkflowResponse,
//! };
//!
//! # tokio_test::block_on(async {
//! let workflow = Workflow::leave(
//!     Arc::new(StubReasoner::classifying(LeaveType::Medical, 15)),
//!     Arc::new(FixedEntitlement(10)),
//!     WorkflowConfig::default(),
//! )
//! .unwrap();
//!
//! let (state, _metrics) = workflow.run("I need 15 days of medical leave").await.unwrap();
//! assert_eq!(state.status, LeaveStatus::Rejected);
//! assert!(state.visited(StepId::Reject));
//!
//! match workflow.run_workflow("I need 15 days of medical leave").await {
//!     WorkflowResponse::Decision(d) => assert_eq!(d.remaining_leaves, 10),
//!     WorkflowResponse::Failure(f) => panic!("{}", f.error),
//! }
//! # });
//! ```

pub mod error;
pub mod config;
pub mod context;
pub mod metrics;
pub mod events;
pub mod state;
pub mod collaborator;
pub mod step;
pub mod graph;
pub mod instrumented;
pub mod workflow;

pub use error::{Error, ErrorKind, GraphError, Result};
pub use config::WorkflowConfig;
pub use context::ExecutionContext;
pub use metrics::WorkflowMetrics;
pub use events::{TraceEntry, WorkflowEvent};
pub use state::{LeaveStatus, LeaveType, StateUpdate, WorkflowState};
pub use collaborator::{
    ClassificationResult, EntitlementLedger, FieldKind, FieldSpec, FixedEntitlement, Reasoner,
    ReplyResult, SchemaDescription, StructuredOutput, StubReasoner,
};
pub use graph::{leave_graph, Edge, Graph, GraphBuilder, Next};
pub use instrumented::InstrumentedNode;
pub use workflow::{LeaveDecision, Workflow, WorkflowFailure, WorkflowResponse};

// Re-export step types
pub use step::{
    CheckBalanceNode, ClassifyNode, Node, NodeOutput, ProcessLeaveNode, ReplyGenerator, StepId,
    TerminalNode, Transition,
};
