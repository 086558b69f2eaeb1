//! Error types for workflow execution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::step::StepId;

/// The main error type for workflow operations.
///
/// Every variant is fatal to the run that produced it. Nothing is retried
/// inside the engine; callers own retry policy.
#[derive(Error, Debug)]
pub enum Error {
    /// The reasoning collaborator produced a classification that failed validation.
    #[error("Classification error: {0}")]
    Classification(String),

    /// The reasoning collaborator could not produce a usable reply.
    #[error("Reply generation error: {0}")]
    ReplyGeneration(String),

    /// The entitlement ledger could not report a balance.
    #[error("Balance lookup error: {0}")]
    BalanceLookup(String),

    /// A branching step and the edge table disagree.
    #[error("Routing error at step '{step}': {reason}")]
    Routing {
        /// The step whose outgoing edge could not be resolved.
        step: StepId,
        /// What went wrong.
        reason: String,
    },

    /// The graph configuration was rejected at build time.
    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),

    /// A step tried to break a state invariant.
    #[error("State violation: {0}")]
    StateViolation(String),

    /// The reasoning collaborator failed outright.
    #[error("Generation error: {0}")]
    Generation(String),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons a [`GraphBuilder`](crate::GraphBuilder) refuses to build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// No entry step was set.
    #[error("no entry step configured")]
    MissingEntry,

    /// An edge or the entry names a step with no handler.
    #[error("step '{0}' has no registered handler")]
    UnknownStep(StepId),

    /// A registered step has no outgoing edge declared.
    #[error("step '{0}' has no outgoing edge")]
    MissingEdge(StepId),

    /// A conditional edge with no destinations.
    #[error("conditional edge from '{0}' has no destinations")]
    EmptyBranch(StepId),

    /// The graph routes back to an already-visited step.
    #[error("cycle detected: {}", format_path(.0))]
    Cycle(Vec<StepId>),

    /// Nothing in the graph ever terminates.
    #[error("graph has no terminal step")]
    NoTerminal,
}

fn format_path(path: &[StepId]) -> String {
    path.iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Stable, serializable classification of an [`Error`] for response payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Classification,
    ReplyGeneration,
    BalanceLookup,
    Routing,
    Graph,
    StateViolation,
    Generation,
    Config,
    Json,
}

impl Error {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Classification(_) => ErrorKind::Classification,
            Error::ReplyGeneration(_) => ErrorKind::ReplyGeneration,
            Error::BalanceLookup(_) => ErrorKind::BalanceLookup,
            Error::Routing { .. } => ErrorKind::Routing,
            Error::Graph(_) => ErrorKind::Graph,
            Error::StateViolation(_) => ErrorKind::StateViolation,
            Error::Generation(_) => ErrorKind::Generation,
            Error::Config(_) => ErrorKind::Config,
            Error::Json(_) => ErrorKind::Json,
        }
    }

    pub(crate) fn routing(step: StepId, reason: impl Into<String>) -> Self {
        Error::Routing {
            step,
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for workflow operations.
pub type Result<T> = std::result::Result<T, Error>;
