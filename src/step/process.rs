//! Routing decision for requests the balance can cover.

use async_trait::async_trait;
use tracing::info;

use super::{Node, NodeOutput, StepId};
use crate::{Error, ExecutionContext, LeaveType, Result, StateUpdate, WorkflowState};

/// Auto-approves single-day medical leave; everything else goes to a human.
///
/// Performs no state mutation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLeaveNode;

impl ProcessLeaveNode {
    /// The destination for a classified request.
    pub fn decide(leave_type: LeaveType, days: u32) -> StepId {
        match (leave_type, days) {
            (LeaveType::Medical, 1) => StepId::Approve,
            (LeaveType::Medical, _) | (LeaveType::Casual, _) => StepId::HumanReview,
        }
    }
}

#[async_trait]
impl Node for ProcessLeaveNode {
    async fn run(&self, _ctx: &ExecutionContext, state: &WorkflowState) -> Result<NodeOutput> {
        let (Some(leave_type), Some(days)) = (state.leave_type, state.number_of_leaves) else {
            return Err(Error::StateViolation(
                "processing needs leaveType and numberOfLeaves".to_string(),
            ));
        };

        let to = Self::decide(leave_type, days);
        info!(%leave_type, days, next = %to, "leave processed");
        Ok(NodeOutput::branch(to, StateUpdate::empty()))
    }

    fn name(&self) -> &str {
        StepId::ProcessLeave.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Transition;

    #[test]
    fn test_decision_table() {
        assert_eq!(ProcessLeaveNode::decide(LeaveType::Medical, 1), StepId::Approve);
        assert_eq!(ProcessLeaveNode::decide(LeaveType::Medical, 2), StepId::HumanReview);
        assert_eq!(ProcessLeaveNode::decide(LeaveType::Casual, 1), StepId::HumanReview);
        assert_eq!(ProcessLeaveNode::decide(LeaveType::Casual, 9), StepId::HumanReview);
    }

    #[tokio::test]
    async fn test_returns_empty_update() {
        let mut state = WorkflowState::new("ana", "text");
        state
            .apply(StateUpdate {
                leave_type: Some(LeaveType::Medical),
                number_of_leaves: Some(1),
                ..StateUpdate::default()
            })
            .unwrap();

        let out = ProcessLeaveNode.run(&ExecutionContext::new(), &state).await.unwrap();
        assert!(out.update.is_empty());
        assert_eq!(out.transition, Transition::Branch(StepId::Approve));
    }
}
