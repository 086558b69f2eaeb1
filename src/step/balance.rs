//! Entitlement balance check.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Node, NodeOutput, StepId};
use crate::collaborator::EntitlementLedger;
use crate::{Error, ExecutionContext, LeaveStatus, Result, StateUpdate, WorkflowState};

/// Looks up the applicant's remaining balance and routes to processing when
/// it covers the request, otherwise to rejection.
pub struct CheckBalanceNode {
    ledger: Arc<dyn EntitlementLedger>,
}

impl CheckBalanceNode {
    pub fn new(ledger: Arc<dyn EntitlementLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Node for CheckBalanceNode {
    async fn run(&self, ctx: &ExecutionContext, state: &WorkflowState) -> Result<NodeOutput> {
        let requested = state.number_of_leaves.ok_or_else(|| {
            Error::StateViolation("balance check needs numberOfLeaves".to_string())
        })?;

        ctx.record_balance_lookup();
        let remaining = self
            .ledger
            .remaining_leaves(&state.applicant)
            .await
            .map_err(|e| match e {
                Error::BalanceLookup(_) => e,
                other => Error::BalanceLookup(other.to_string()),
            })?;

        let update = StateUpdate::empty()
            .with_status(LeaveStatus::Pending)
            .with_remaining_leaves(remaining);

        if requested <= remaining {
            info!(applicant = %state.applicant, requested, remaining, "balance sufficient");
            Ok(NodeOutput::branch(StepId::ProcessLeave, update))
        } else {
            warn!(applicant = %state.applicant, requested, remaining, "balance insufficient");
            Ok(NodeOutput::branch(StepId::Reject, update))
        }
    }

    fn name(&self) -> &str {
        StepId::CheckBalance.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Transition;
    use crate::{FixedEntitlement, StateUpdate};

    struct Offline;

    #[async_trait]
    impl EntitlementLedger for Offline {
        async fn remaining_leaves(&self, _applicant: &str) -> Result<u32> {
            Err(Error::Generation("connection refused".to_string()))
        }
    }

    fn requesting(days: u32) -> WorkflowState {
        let mut state = WorkflowState::new("ana", "text");
        state
            .apply(StateUpdate {
                number_of_leaves: Some(days),
                ..StateUpdate::default()
            })
            .unwrap();
        state
    }

    async fn route(days: u32, balance: u32) -> NodeOutput {
        CheckBalanceNode::new(Arc::new(FixedEntitlement(balance)))
            .run(&ExecutionContext::new(), &requesting(days))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_exact_balance_goes_to_process() {
        let out = route(10, 10).await;
        assert_eq!(out.transition, Transition::Branch(StepId::ProcessLeave));
        assert_eq!(out.update.remaining_leaves, Some(10));
        assert_eq!(out.update.status, Some(LeaveStatus::Pending));
    }

    #[tokio::test]
    async fn test_overdraw_goes_to_reject() {
        let out = route(11, 10).await;
        assert_eq!(out.transition, Transition::Branch(StepId::Reject));
    }

    #[tokio::test]
    async fn test_ledger_failure_is_balance_lookup_error() {
        let err = CheckBalanceNode::new(Arc::new(Offline))
            .run(&ExecutionContext::new(), &requesting(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BalanceLookup(_)));
    }

    #[tokio::test]
    async fn test_unclassified_state_is_rejected() {
        let err = CheckBalanceNode::new(Arc::new(FixedEntitlement(10)))
            .run(&ExecutionContext::new(), &WorkflowState::new("ana", "text"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StateViolation(_)));
    }
}
