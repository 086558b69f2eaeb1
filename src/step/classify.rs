//! Classification of the raw application text.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{Node, NodeOutput, StepId};
use crate::collaborator::{request, ClassificationResult, Reasoner};
use crate::{ExecutionContext, Result, StateUpdate, WorkflowConfig, WorkflowState};

/// Extracts leave type, dates and day count from the application.
///
/// Malformed collaborator output fails the step; nothing is merged.
pub struct ClassifyNode {
    reasoner: Arc<dyn Reasoner>,
    config: Arc<WorkflowConfig>,
}

impl ClassifyNode {
    pub fn new(reasoner: Arc<dyn Reasoner>, config: Arc<WorkflowConfig>) -> Self {
        Self { reasoner, config }
    }
}

#[async_trait]
impl Node for ClassifyNode {
    async fn run(&self, ctx: &ExecutionContext, state: &WorkflowState) -> Result<NodeOutput> {
        let prompt = self.config.render_classification(state.application());
        let result: ClassificationResult = request(self.reasoner.as_ref(), ctx, &prompt).await?;

        info!(
            leave_type = %result.leave_type,
            days = result.number_of_leaves,
            start = %result.start_date,
            end = %result.end_date,
            "application classified"
        );
        ctx.emit_artifact(StepId::Classify, "classification", &result);

        Ok(NodeOutput::next(StateUpdate {
            leave_type: Some(result.leave_type),
            start_date: Some(result.start_date),
            end_date: Some(result.end_date),
            number_of_leaves: Some(result.number_of_leaves),
            ..StateUpdate::default()
        }))
    }

    fn name(&self) -> &str {
        StepId::Classify.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Transition;
    use crate::{Error, LeaveType, StubReasoner};
    use serde_json::json;

    fn node(stub: StubReasoner) -> ClassifyNode {
        ClassifyNode::new(Arc::new(stub), Arc::new(WorkflowConfig::default()))
    }

    #[tokio::test]
    async fn test_merges_all_classification_fields() {
        let ctx = ExecutionContext::new();
        let state = WorkflowState::new("ana", "3 days medical leave");
        let out = node(StubReasoner::classifying(LeaveType::Medical, 3))
            .run(&ctx, &state)
            .await
            .unwrap();

        assert_eq!(out.transition, Transition::Continue);
        assert_eq!(out.update.leave_type, Some(LeaveType::Medical));
        assert_eq!(out.update.number_of_leaves, Some(3));
        assert!(out.update.start_date.is_some());
        assert!(out.update.end_date.is_some());
        assert!(out.update.status.is_none());
        assert_eq!(ctx.trace_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_payload_is_classification_error() {
        let state = WorkflowState::new("ana", "???");
        let err = node(StubReasoner::new(json!("not an object")))
            .run(&ExecutionContext::new(), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
    }
}
