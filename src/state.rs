//! The state record threaded through every step of a leave workflow run.
//!
//! A [`WorkflowState`] is created once per application with only the raw text
//! populated. Steps never mutate it directly: they return a [`StateUpdate`]
//! and the engine merges it with [`WorkflowState::apply`], which is where the
//! set-once and status-transition rules are enforced.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result, step::StepId};

/// Business status of a leave application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    /// Whether this status can no longer change.
    pub fn is_final(self) -> bool {
        matches!(self, LeaveStatus::Approved | LeaveStatus::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of leave requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeaveType {
    Medical,
    Casual,
}

impl LeaveType {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaveType::Medical => "MEDICAL",
            LeaveType::Casual => "CASUAL",
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LeaveType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MEDICAL" => Ok(LeaveType::Medical),
            "CASUAL" => Ok(LeaveType::Casual),
            other => Err(format!("unknown leave type '{other}'")),
        }
    }
}

/// The mutable record passed through the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    application: String,
    /// Who the application is for; used for the entitlement lookup.
    pub applicant: String,
    pub status: LeaveStatus,
    pub leave_type: Option<LeaveType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub number_of_leaves: Option<u32>,
    pub remaining_leaves: Option<u32>,
    /// The last branch chosen by a branching step.
    pub routing_hint: Option<StepId>,
    pub reply: Option<String>,
    /// Every step executed so far, in order.
    pub path: Vec<StepId>,
}

impl WorkflowState {
    /// Create the initial state for an application: only the text, the
    /// applicant and a `PENDING` status are set.
    pub fn new(applicant: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            applicant: applicant.into(),
            status: LeaveStatus::Pending,
            leave_type: None,
            start_date: None,
            end_date: None,
            number_of_leaves: None,
            remaining_leaves: None,
            routing_hint: None,
            reply: None,
            path: Vec::new(),
        }
    }

    /// The raw application text. Immutable after creation.
    pub fn application(&self) -> &str {
        &self.application
    }

    /// Whether the run routed through `step`.
    pub fn visited(&self, step: StepId) -> bool {
        self.path.contains(&step)
    }

    /// Merge a partial update. Fields absent from `update` are left untouched.
    ///
    /// Fails without modifying `self` if the update would overwrite a
    /// classification field or move the status out of a final value.
    pub fn apply(&mut self, update: StateUpdate) -> Result<()> {
        set_once("leaveType", &self.leave_type, &update.leave_type)?;
        set_once("startDate", &self.start_date, &update.start_date)?;
        set_once("endDate", &self.end_date, &update.end_date)?;
        set_once("numberOfLeaves", &self.number_of_leaves, &update.number_of_leaves)?;

        if let Some(next) = update.status {
            if self.status.is_final() && next != self.status {
                return Err(Error::StateViolation(format!(
                    "status cannot move from {} to {}",
                    self.status, next
                )));
            }
        }

        if let Some(v) = update.leave_type {
            self.leave_type = Some(v);
        }
        if let Some(v) = update.start_date {
            self.start_date = Some(v);
        }
        if let Some(v) = update.end_date {
            self.end_date = Some(v);
        }
        if let Some(v) = update.number_of_leaves {
            self.number_of_leaves = Some(v);
        }
        if let Some(v) = update.remaining_leaves {
            self.remaining_leaves = Some(v);
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if let Some(v) = update.reply {
            self.reply = Some(v);
        }
        Ok(())
    }
}

fn set_once<T: PartialEq + fmt::Debug>(field: &str, current: &Option<T>, next: &Option<T>) -> Result<()> {
    match (current, next) {
        (Some(old), Some(new)) if old != new => Err(Error::StateViolation(format!(
            "{field} is already set to {old:?}, refusing {new:?}"
        ))),
        _ => Ok(()),
    }
}

/// A partial update returned by a step. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeaveStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_type: Option<LeaveType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_leaves: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_leaves: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

impl StateUpdate {
    /// An update that changes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: LeaveStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_remaining_leaves(mut self, remaining: u32) -> Self {
        self.remaining_leaves = Some(remaining);
        self
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Whether this update carries no fields at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
