//! External collaborators the steps delegate to.
//!
//! The workflow never talks to a model or a database directly. It asks a
//! [`Reasoner`] for a value shaped like a [`SchemaDescription`] and converts
//! the answer into one of the typed results below, and it asks an
//! [`EntitlementLedger`] for the applicant's remaining balance.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Mutex;

use crate::{Error, ExecutionContext, LeaveStatus, LeaveType, Result};

/// The JSON type expected for a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    String,
    Integer,
    /// An ISO-8601 calendar date, `YYYY-MM-DD`.
    Date,
    Enum { values: Vec<String> },
}

/// One field the collaborator must produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub description: String,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
        }
    }
}

/// Target shape handed to the reasoning collaborator alongside a prompt.
///
/// Turning this into format instructions is the collaborator's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldSpec>,
}

/// Converts a prompt plus a schema into a structured value.
///
/// Implementations must fail rather than return partial output; the typed
/// results still validate everything they receive.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn generate(&self, prompt: &str, schema: &SchemaDescription) -> Result<Value>;
}

/// A typed result requested from a [`Reasoner`].
pub trait StructuredOutput: Sized {
    /// The schema sent with every request for this type.
    fn schema() -> SchemaDescription;

    /// Validate a raw collaborator value.
    fn from_value(value: Value) -> Result<Self>;

    /// The error reported when the collaborator fails for this type.
    fn failure(message: String) -> Error;
}

/// Ask `reasoner` for a `T`, counting the call on `ctx`.
///
/// Collaborator failures surface as `T`'s own error kind.
pub async fn request<T: StructuredOutput>(
    reasoner: &dyn Reasoner,
    ctx: &ExecutionContext,
    prompt: &str,
) -> Result<T> {
    ctx.record_reasoning_call();
    let schema = T::schema();
    let value = reasoner
        .generate(prompt, &schema)
        .await
        .map_err(|e| T::failure(e.to_string()))?;
    T::from_value(value)
}

/// Schema name of [`ClassificationResult`].
pub const CLASSIFICATION_SCHEMA: &str = "classification";
/// Schema name of [`ReplyResult`].
pub const REPLY_SCHEMA: &str = "reply";

/// A validated classification of a leave application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_leaves: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    leave_type: String,
    start_date: String,
    end_date: String,
    number_of_leaves: Value,
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| Error::Classification(format!("{field} '{raw}' is not an ISO date")))
}

fn parse_count(raw: &Value) -> Result<u32> {
    let count = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::Classification(format!("numberOfLeaves {raw} is not an integer")))?;

    if count <= 0 {
        return Err(Error::Classification(format!(
            "numberOfLeaves must be positive, got {count}"
        )));
    }
    u32::try_from(count)
        .map_err(|_| Error::Classification(format!("numberOfLeaves {count} is out of range")))
}

impl StructuredOutput for ClassificationResult {
    fn schema() -> SchemaDescription {
        SchemaDescription {
            name: CLASSIFICATION_SCHEMA.to_string(),
            description: "Classification of a leave application".to_string(),
            fields: vec![
                FieldSpec::new(
                    "leaveType",
                    FieldKind::Enum {
                        values: vec!["MEDICAL".to_string(), "CASUAL".to_string()],
                    },
                    "The type of leave classified into MEDICAL or CASUAL",
                ),
                FieldSpec::new("startDate", FieldKind::Date, "Starting date of leave"),
                FieldSpec::new("endDate", FieldKind::Date, "End date of leave"),
                FieldSpec::new("numberOfLeaves", FieldKind::Integer, "Number of leave days asked"),
            ],
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        let raw: RawClassification = serde_json::from_value(value)
            .map_err(|e| Error::Classification(format!("unparsable classification: {e}")))?;

        let leave_type = raw
            .leave_type
            .parse::<LeaveType>()
            .map_err(Error::Classification)?;
        let start_date = parse_date("startDate", &raw.start_date)?;
        let end_date = parse_date("endDate", &raw.end_date)?;
        if end_date < start_date {
            return Err(Error::Classification(format!(
                "endDate {end_date} is before startDate {start_date}"
            )));
        }
        let number_of_leaves = parse_count(&raw.number_of_leaves)?;

        Ok(Self {
            leave_type,
            start_date,
            end_date,
            number_of_leaves,
        })
    }

    fn failure(message: String) -> Error {
        Error::Classification(message)
    }
}

/// A validated reply to send back to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyResult {
    pub reply: String,
}

impl StructuredOutput for ReplyResult {
    fn schema() -> SchemaDescription {
        SchemaDescription {
            name: REPLY_SCHEMA.to_string(),
            description: "Reply to the applicant about the leave application".to_string(),
            fields: vec![FieldSpec::new(
                "reply",
                FieldKind::String,
                "Reply back to the user about leave application status",
            )],
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        let result: ReplyResult = serde_json::from_value(value)
            .map_err(|e| Error::ReplyGeneration(format!("unparsable reply: {e}")))?;
        if result.reply.trim().is_empty() {
            return Err(Error::ReplyGeneration("reply is empty".to_string()));
        }
        Ok(result)
    }

    fn failure(message: String) -> Error {
        Error::ReplyGeneration(message)
    }
}

/// Authoritative source of remaining leave balances.
#[async_trait]
pub trait EntitlementLedger: Send + Sync {
    async fn remaining_leaves(&self, applicant: &str) -> Result<u32>;
}

/// A ledger that reports the same balance for everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedEntitlement(pub u32);

#[async_trait]
impl EntitlementLedger for FixedEntitlement {
    async fn remaining_leaves(&self, _applicant: &str) -> Result<u32> {
        Ok(self.0)
    }
}

/// A deterministic [`Reasoner`] for tests and examples.
///
/// Classification requests get the configured payload. Reply requests get a
/// canned reply naming the status found in the prompt, unless a raw reply
/// payload was configured.
///
/// # Example
///
/// ```rust
/// use leave_workflow::{LeaveType, Reasoner, StructuredOutput, ClassificationResult, StubReasoner};
///
/// # tokio_test::block_on(async {
/// let stub = StubReasoner::classifying(LeaveType::Medical, 2);
/// let value = stub
///     .generate("two days off", &ClassificationResult::schema())
///     .await
///     .unwrap();
/// let result = ClassificationResult::from_value(value).unwrap();
/// assert_eq!(result.number_of_leaves, 2);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct StubReasoner {
    classification: Option<Value>,
    reply: Option<Value>,
    fail_replies: bool,
    prompts: Mutex<Vec<String>>,
}

impl StubReasoner {
    /// Serve `classification` verbatim for classification requests.
    pub fn new(classification: Value) -> Self {
        Self {
            classification: Some(classification),
            ..Self::default()
        }
    }

    /// Serve a well-formed classification starting 2025-01-06.
    pub fn classifying(leave_type: LeaveType, days: u32) -> Self {
        let start = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap_or_default();
        let end = start
            .checked_add_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(start);
        Self::new(json!({
            "leaveType": leave_type.as_str(),
            "startDate": start.to_string(),
            "endDate": end.to_string(),
            "numberOfLeaves": days,
        }))
    }

    /// A stub whose classification requests always fail.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Serve `reply` verbatim for reply requests.
    pub fn with_reply(mut self, reply: Value) -> Self {
        self.reply = Some(reply);
        self
    }

    /// Make every reply request fail.
    pub fn failing_replies(mut self) -> Self {
        self.fail_replies = true;
        self
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn status_in(prompt: &str) -> LeaveStatus {
        [LeaveStatus::Pending, LeaveStatus::Approved, LeaveStatus::Rejected]
            .into_iter()
            .filter_map(|s| prompt.rfind(s.as_str()).map(|pos| (pos, s)))
            .max_by_key(|(pos, _)| *pos)
            .map(|(_, s)| s)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Reasoner for StubReasoner {
    async fn generate(&self, prompt: &str, schema: &SchemaDescription) -> Result<Value> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match schema.name.as_str() {
            CLASSIFICATION_SCHEMA => self
                .classification
                .clone()
                .ok_or_else(|| Error::Generation("classifier unavailable".to_string())),
            REPLY_SCHEMA if self.fail_replies => {
                Err(Error::Generation("reply model unavailable".to_string()))
            }
            REPLY_SCHEMA => Ok(self.reply.clone().unwrap_or_else(|| {
                let reply = match Self::status_in(prompt) {
                    LeaveStatus::Approved => "Your leave application has been approved.",
                    LeaveStatus::Rejected => {
                        "Your leave application has been rejected: insufficient leave balance."
                    }
                    LeaveStatus::Pending => {
                        "Your leave application is pending review by your manager."
                    }
                };
                json!({ "reply": reply })
            })),
            other => Err(Error::Generation(format!("unknown schema '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(value: Value) -> Result<ClassificationResult> {
        ClassificationResult::from_value(value)
    }

    #[test]
    fn test_valid_classification() {
        let result = classification(json!({
            "leaveType": "medical",
            "startDate": "2025-03-03",
            "endDate": "2025-03-05",
            "numberOfLeaves": "3",
        }))
        .unwrap();
        assert_eq!(result.leave_type, LeaveType::Medical);
        assert_eq!(result.number_of_leaves, 3);
        assert_eq!(result.end_date, NaiveDate::from_ymd_opt(2025, 3, 5).unwrap());
    }

    #[test]
    fn test_leave_type_is_matched_case_insensitively() {
        for (raw, expected) in [
            ("MEDICAL", LeaveType::Medical),
            ("Medical", LeaveType::Medical),
            (" casual ", LeaveType::Casual),
        ] {
            let result = classification(json!({
                "leaveType": raw,
                "startDate": "2025-03-03",
                "endDate": "2025-03-03",
                "numberOfLeaves": 1,
            }))
            .unwrap();
            assert_eq!(result.leave_type, expected, "{raw}");
        }

        for raw in ["", "MEDICALLY", "sick"] {
            let err = classification(json!({
                "leaveType": raw,
                "startDate": "2025-03-03",
                "endDate": "2025-03-03",
                "numberOfLeaves": 1,
            }))
            .unwrap_err();
            assert!(matches!(err, Error::Classification(_)), "{raw}");
        }
    }

    #[test]
    fn test_rejects_bad_enum() {
        let err = classification(json!({
            "leaveType": "ANNUAL",
            "startDate": "2025-03-03",
            "endDate": "2025-03-03",
            "numberOfLeaves": 1,
        }))
        .unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
    }

    #[test]
    fn test_rejects_non_iso_date() {
        let err = classification(json!({
            "leaveType": "CASUAL",
            "startDate": "03/03/2025",
            "endDate": "2025-03-03",
            "numberOfLeaves": 1,
        }))
        .unwrap_err();
        assert!(err.to_string().contains("startDate"));
    }

    #[test]
    fn test_rejects_non_positive_count() {
        for count in [json!(0), json!(-2), json!(1.5), json!(null)] {
            let err = classification(json!({
                "leaveType": "CASUAL",
                "startDate": "2025-03-03",
                "endDate": "2025-03-03",
                "numberOfLeaves": count,
            }))
            .unwrap_err();
            assert!(matches!(err, Error::Classification(_)), "{count}");
        }
    }

    #[test]
    fn test_rejects_inverted_dates() {
        let err = classification(json!({
            "leaveType": "CASUAL",
            "startDate": "2025-03-05",
            "endDate": "2025-03-03",
            "numberOfLeaves": 1,
        }))
        .unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
    }

    #[test]
    fn test_blank_reply_is_rejected() {
        let err = ReplyResult::from_value(json!({ "reply": "   " })).unwrap_err();
        assert!(matches!(err, Error::ReplyGeneration(_)));
        let err = ReplyResult::from_value(json!("just text")).unwrap_err();
        assert!(matches!(err, Error::ReplyGeneration(_)));
    }

    #[test]
    fn test_schema_serializes_field_kinds() {
        let json = serde_json::to_value(ClassificationResult::schema()).unwrap();
        assert_eq!(json["fields"][0]["name"], "leaveType");
        assert_eq!(json["fields"][0]["type"], "enum");
        assert_eq!(json["fields"][1]["type"], "date");
    }

    #[tokio::test]
    async fn test_request_maps_generation_failure_to_type_error() {
        let ctx = ExecutionContext::new();
        let stub = StubReasoner::unavailable();
        let err = request::<ClassificationResult>(&stub, &ctx, "text").await.unwrap_err();
        assert!(matches!(err, Error::Classification(_)));

        let stub = StubReasoner::unavailable().failing_replies();
        let err = request::<ReplyResult>(&stub, &ctx, "text").await.unwrap_err();
        assert!(matches!(err, Error::ReplyGeneration(_)));
        assert_eq!(ctx.snapshot().reasoning_calls, 2);
    }

    #[tokio::test]
    async fn test_stub_reply_follows_prompt_status() {
        let stub = StubReasoner::unavailable();
        let value = stub
            .generate("I was APPROVED last time\nStatus: REJECTED", &ReplyResult::schema())
            .await
            .unwrap();
        assert!(value["reply"].as_str().unwrap().contains("rejected"));
        assert_eq!(stub.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_fixed_entitlement() {
        assert_eq!(FixedEntitlement(10).remaining_leaves("ana").await.unwrap(), 10);
    }
}
