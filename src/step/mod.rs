//! Step identity, the node trait, and the leave workflow's step handlers.
//!
//! A node reads the current [`WorkflowState`] and returns a [`NodeOutput`]:
//! a partial [`StateUpdate`] plus a [`Transition`] telling the router how to
//! leave the node. Branching nodes name their destination directly with
//! [`Transition::Branch`]; the router checks it against the edge table.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ExecutionContext, Result, StateUpdate, WorkflowState};

pub mod balance;
pub mod classify;
pub mod process;
pub mod reply;
pub mod terminal;

pub use balance::CheckBalanceNode;
pub use classify::ClassifyNode;
pub use process::ProcessLeaveNode;
pub use reply::ReplyGenerator;
pub use terminal::TerminalNode;

/// Identifies a step in the leave workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepId {
    #[serde(rename = "classify")]
    Classify,
    #[serde(rename = "checkBalance")]
    CheckBalance,
    #[serde(rename = "process")]
    ProcessLeave,
    #[serde(rename = "approve")]
    Approve,
    #[serde(rename = "reject")]
    Reject,
    #[serde(rename = "humanReview")]
    HumanReview,
}

impl StepId {
    /// Every step, in declaration order.
    pub const ALL: [StepId; 6] = [
        StepId::Classify,
        StepId::CheckBalance,
        StepId::ProcessLeave,
        StepId::Approve,
        StepId::Reject,
        StepId::HumanReview,
    ];

    /// Stable label used in logs and serialized traces.
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::Classify => "classify",
            StepId::CheckBalance => "checkBalance",
            StepId::ProcessLeave => "process",
            StepId::Approve => "approve",
            StepId::Reject => "reject",
            StepId::HumanReview => "humanReview",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a node wants to leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Follow the node's fixed edge.
    Continue,
    /// Take the named branch of the node's conditional edge.
    Branch(StepId),
    /// Stop the run after this node.
    End,
}

/// What a node hands back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOutput {
    pub update: StateUpdate,
    pub transition: Transition,
}

impl NodeOutput {
    /// Merge `update` and follow the fixed edge.
    pub fn next(update: StateUpdate) -> Self {
        Self {
            update,
            transition: Transition::Continue,
        }
    }

    /// Merge `update` and take branch `to`.
    pub fn branch(to: StepId, update: StateUpdate) -> Self {
        Self {
            update,
            transition: Transition::Branch(to),
        }
    }

    /// Merge `update` and stop.
    pub fn end(update: StateUpdate) -> Self {
        Self {
            update,
            transition: Transition::End,
        }
    }
}

/// A named unit of work in the graph.
///
/// Nodes must not keep per-run state: one instance serves every run of every
/// workflow sharing the graph.
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute against the current state.
    async fn run(&self, ctx: &ExecutionContext, state: &WorkflowState) -> Result<NodeOutput>;

    /// Returns a human-readable name for this node. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_serde() {
        for step in StepId::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.as_str()));
        }
    }
}
