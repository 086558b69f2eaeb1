//! Metrics collection for workflow execution.
//!
//! This module provides `WorkflowMetrics` for tracking how many steps ran,
//! how often the reasoning collaborator was consulted, and any failures.

use serde::{Serialize, Deserialize};

/// Aggregated metrics for a single workflow run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowMetrics {
    /// Number of steps completed successfully.
    pub steps_completed: usize,
    /// Number of calls made to the reasoning collaborator.
    pub reasoning_calls: usize,
    /// Number of entitlement balance lookups.
    pub balance_lookups: usize,
    /// Collected failure messages from the run.
    pub failures: Vec<String>,
}

impl WorkflowMetrics {
    /// Record a failure message.
    pub fn record_failure(&mut self, error: String) {
        self.failures.push(error);
    }

    /// Increment the steps completed counter.
    pub fn record_step(&mut self) {
        self.steps_completed += 1;
    }

    /// Increment the reasoning call counter.
    pub fn record_reasoning_call(&mut self) {
        self.reasoning_calls += 1;
    }

    /// Increment the balance lookup counter.
    pub fn record_balance_lookup(&mut self) {
        self.balance_lookups += 1;
    }

    /// Check if there were any failures.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
