//! Reply generation shared by the terminal steps.

use std::sync::Arc;
use tracing::debug;

use crate::collaborator::{request, Reasoner, ReplyResult};
use crate::{ExecutionContext, LeaveStatus, Result, WorkflowConfig};

/// Asks the reasoning collaborator for a reply given the application and a status.
///
/// Not a graph node: terminal nodes call it after deciding their status.
#[derive(Clone)]
pub struct ReplyGenerator {
    reasoner: Arc<dyn Reasoner>,
    config: Arc<WorkflowConfig>,
}

impl ReplyGenerator {
    pub fn new(reasoner: Arc<dyn Reasoner>, config: Arc<WorkflowConfig>) -> Self {
        Self { reasoner, config }
    }

    /// Produce a non-blank reply or fail with a reply generation error.
    pub async fn generate(
        &self,
        ctx: &ExecutionContext,
        application: &str,
        status: LeaveStatus,
    ) -> Result<String> {
        let prompt = self.config.render_reply(application, status.as_str());
        let result: ReplyResult = request(self.reasoner.as_ref(), ctx, &prompt).await?;
        debug!(%status, chars = result.reply.len(), "reply generated");
        Ok(result.reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, StubReasoner};
    use serde_json::json;

    fn generator(stub: StubReasoner) -> (Arc<StubReasoner>, ReplyGenerator) {
        let stub = Arc::new(stub);
        let replies = ReplyGenerator::new(stub.clone(), Arc::new(WorkflowConfig::default()));
        (stub, replies)
    }

    #[tokio::test]
    async fn test_prompt_carries_application_and_status() {
        let (stub, replies) = generator(StubReasoner::unavailable());
        let ctx = ExecutionContext::new();
        let reply = replies
            .generate(&ctx, "one day off", LeaveStatus::Approved)
            .await
            .unwrap();
        assert!(reply.contains("approved"));

        let prompts = stub.prompts();
        assert!(prompts[0].contains("one day off"));
        assert!(prompts[0].contains("APPROVED"));
    }

    #[tokio::test]
    async fn test_empty_reply_fails() {
        let (_, replies) = generator(StubReasoner::unavailable().with_reply(json!({ "reply": "" })));
        let err = replies
            .generate(&ExecutionContext::new(), "text", LeaveStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReplyGeneration(_)));
    }
}
