//! The three terminal steps: approve, reject and human review.

use async_trait::async_trait;
use tracing::info;

use super::{Node, NodeOutput, ReplyGenerator, StepId};
use crate::{ExecutionContext, LeaveStatus, Result, StateUpdate, WorkflowState};

/// Settles the status for this run and attaches a generated reply.
///
/// Human review leaves the status `PENDING`; the run still ends here and
/// nothing resumes it.
pub struct TerminalNode {
    step: StepId,
    status: LeaveStatus,
    replies: ReplyGenerator,
}

impl TerminalNode {
    pub fn approve(replies: ReplyGenerator) -> Self {
        Self {
            step: StepId::Approve,
            status: LeaveStatus::Approved,
            replies,
        }
    }

    pub fn reject(replies: ReplyGenerator) -> Self {
        Self {
            step: StepId::Reject,
            status: LeaveStatus::Rejected,
            replies,
        }
    }

    pub fn human_review(replies: ReplyGenerator) -> Self {
        Self {
            step: StepId::HumanReview,
            status: LeaveStatus::Pending,
            replies,
        }
    }
}

#[async_trait]
impl Node for TerminalNode {
    async fn run(&self, ctx: &ExecutionContext, state: &WorkflowState) -> Result<NodeOutput> {
        info!(step = %self.step, status = %self.status, applicant = %state.applicant, "settling application");
        let reply = self
            .replies
            .generate(ctx, state.application(), self.status)
            .await?;

        Ok(NodeOutput::end(
            StateUpdate::empty().with_status(self.status).with_reply(reply),
        ))
    }

    fn name(&self) -> &str {
        self.step.as_str()
    }
}
