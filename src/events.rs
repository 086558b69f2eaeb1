//! Structured workflow execution events for tracing and observability.
//!
//! This module defines the event types emitted while a leave application
//! moves through the graph: step boundaries, routing decisions, intermediate
//! artifacts and errors.

use serde::{Serialize, Deserialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::step::StepId;

/// Events that can be emitted during workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WorkflowEvent {
    /// A step has started execution.
    StepStart {
        /// The step being executed.
        step: StepId,
    },
    /// A step has finished successfully.
    StepEnd {
        /// The step that completed.
        step: StepId,
        /// Duration of execution in milliseconds.
        duration_ms: u128,
    },
    /// The router resolved the edge leaving `from`.
    ///
    /// `to` is `None` when the run terminated at `from`.
    Routed {
        from: StepId,
        to: Option<StepId>,
    },
    /// An intermediate artifact was produced during execution, such as the
    /// validated classification.
    Artifact {
        /// The step that produced the artifact.
        step: StepId,
        /// Key identifying the artifact (e.g., "classification").
        key: String,
        /// The artifact data as a JSON value.
        data: serde_json::Value,
    },
    /// An error occurred during step execution.
    Error {
        /// The step where the error occurred.
        step: StepId,
        /// Error message describing what went wrong.
        message: String,
    },
}

/// A timestamped trace entry containing a workflow event.
///
/// Each trace entry records when the event occurred (as Unix epoch milliseconds)
/// along with the event itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Unix epoch timestamp in milliseconds when this event occurred.
    pub timestamp: u128,
    /// The workflow event that was recorded.
    #[serde(flatten)]
    pub event: WorkflowEvent,
}

impl TraceEntry {
    /// Create a new trace entry with the current timestamp.
    #[must_use]
    pub fn new(event: WorkflowEvent) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self { timestamp, event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_entry_serialization() {
        let entry = TraceEntry::new(WorkflowEvent::StepStart {
            step: StepId::Classify,
        });

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"StepStart\""));
        assert!(json.contains("\"step\":\"classify\""));
        assert!(json.contains("\"timestamp\":"));
    }

    #[test]
    fn test_routed_event_to_terminal() {
        let event = WorkflowEvent::Routed {
            from: StepId::Approve,
            to: None,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Routed\""));
        assert!(json.contains("\"from\":\"approve\""));
        assert!(json.contains("\"to\":null"));
    }
}
