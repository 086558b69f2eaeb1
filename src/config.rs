//! Runtime configuration for the leave workflow.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::{Error, Result};

/// Environment variable overriding [`WorkflowConfig::name`].
pub const ENV_NAME: &str = "LEAVE_WORKFLOW_NAME";
/// Environment variable overriding [`WorkflowConfig::default_applicant`].
pub const ENV_APPLICANT: &str = "LEAVE_WORKFLOW_APPLICANT";
/// Environment variable overriding [`WorkflowConfig::default_entitlement`].
pub const ENV_ENTITLEMENT: &str = "LEAVE_WORKFLOW_ENTITLEMENT";

const CLASSIFICATION_PROMPT: &str = "Analyze the leave application and classify it into MEDICAL or CASUAL. \
Extract the start date and end date of the leave in ISO format (YYYY-MM-DD) along with the number of leave days.\n\
Application:\n{application}";

const REPLY_PROMPT: &str = "Based on this leave application and the status provided, \
generate a reply to send back to the applicant.\n\
Application:\n{application}\nStatus: {status}";

/// Settings shared by every run of a workflow.
///
/// Prompt templates use `{application}` and `{status}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Human-readable name, used in logs.
    pub name: String,
    /// Applicant used when the caller does not name one.
    pub default_applicant: String,
    /// Balance reported by the fixed entitlement ledger.
    pub default_entitlement: u32,
    pub classification_prompt: String,
    pub reply_prompt: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            name: "leave_workflow".to_string(),
            default_applicant: "anonymous".to_string(),
            default_entitlement: 10,
            classification_prompt: CLASSIFICATION_PROMPT.to_string(),
            reply_prompt: REPLY_PROMPT.to_string(),
        }
    }
}

impl WorkflowConfig {
    /// Defaults overridden by any `LEAVE_WORKFLOW_*` environment variables.
    ///
    /// A `.env` file in the working directory or its parents is loaded first;
    /// it never overrides variables already set in the process.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::default().merge_vars(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading the `.env`-style file at `path`
    /// without touching the process environment. Process variables still win.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_err = |e: dotenv::Error| Error::Config(format!("{}: {e}", path.display()));
        let file = dotenv::from_path_iter(path)
            .map_err(config_err)?
            .collect::<std::result::Result<HashMap<String, String>, _>>()
            .map_err(config_err)?;
        Self::default().merge_vars(|key| std::env::var(key).ok().or_else(|| file.get(key).cloned()))
    }

    /// Parse a JSON document; missing keys take their default.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    fn merge_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(name) = var(ENV_NAME) {
            self.name = name;
        }
        if let Some(applicant) = var(ENV_APPLICANT) {
            self.default_applicant = applicant;
        }
        if let Some(raw) = var(ENV_ENTITLEMENT) {
            self.default_entitlement = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{ENV_ENTITLEMENT} must be a non-negative integer, got '{raw}'"))
            })?;
        }
        Ok(self)
    }

    /// Set the workflow name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the balance reported by the fixed entitlement ledger.
    pub fn with_entitlement(mut self, days: u32) -> Self {
        self.default_entitlement = days;
        self
    }

    pub(crate) fn render_classification(&self, application: &str) -> String {
        fill(&self.classification_prompt, &[("application", application)])
    }

    pub(crate) fn render_reply(&self, application: &str, status: &str) -> String {
        fill(&self.reply_prompt, &[("application", application), ("status", status)])
    }
}

/// Substitute `{key}` placeholders in a single pass over `template`.
///
/// Substituted values are never scanned again, so placeholder-like text in
/// an application is passed through verbatim.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let hit = vars
            .iter()
            .find(|(key, _)| tail.starts_with(key) && tail[key.len()..].starts_with('}'));
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.default_entitlement, 10);
        assert_eq!(config.default_applicant, "anonymous");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            [(ENV_ENTITLEMENT, " 4 "), (ENV_APPLICANT, "ana")].into_iter().collect();
        let config = WorkflowConfig::default()
            .merge_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.default_entitlement, 4);
        assert_eq!(config.default_applicant, "ana");
        assert_eq!(config.name, "leave_workflow");
    }

    #[test]
    fn test_invalid_entitlement_is_config_error() {
        let err = WorkflowConfig::default()
            .merge_vars(|k| (k == ENV_ENTITLEMENT).then(|| "-3".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_json_fills_missing_keys() {
        let config = WorkflowConfig::from_json(r#"{"default_entitlement": 3}"#).unwrap();
        assert_eq!(config.default_entitlement, 3);
        assert_eq!(config.default_applicant, "anonymous");
    }

    #[test]
    fn test_from_env_without_overrides_keeps_prompts() {
        let config = WorkflowConfig::from_env().unwrap();
        assert_eq!(config.reply_prompt, REPLY_PROMPT);
        assert_eq!(config.classification_prompt, CLASSIFICATION_PROMPT);
    }

    #[test]
    fn test_from_env_file() {
        let path = std::env::temp_dir().join(format!("leave-workflow-{}.env", std::process::id()));
        std::fs::write(&path, "LEAVE_WORKFLOW_NAME=from-file\nLEAVE_WORKFLOW_ENTITLEMENT=7\n").unwrap();
        let config = WorkflowConfig::from_env_file(&path);
        std::fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert_eq!(config.name, "from-file");
        assert_eq!(config.default_entitlement, 7);
        assert_eq!(config.default_applicant, "anonymous");
    }

    #[test]
    fn test_missing_env_file_is_config_error() {
        let err = WorkflowConfig::from_env_file("/nonexistent/leave-workflow.env").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_application_placeholders_are_kept_verbatim() {
        let config = WorkflowConfig::default();
        let application = "my manager said {status} already, see {application} and {other";
        let prompt = config.render_reply(application, "REJECTED");
        assert_eq!(
            prompt,
            format!(
                "Based on this leave application and the status provided, generate a reply to send back to the applicant.\nApplication:\n{application}\nStatus: REJECTED"
            )
        );
        assert!(config
            .render_classification("{status} {application}")
            .ends_with("Application:\n{status} {application}"));
    }

    #[test]
    fn test_prompts_render_placeholders() {
        let config = WorkflowConfig::default();
        let prompt = config.render_reply("one day off", "APPROVED");
        assert!(prompt.contains("one day off"));
        assert!(prompt.contains("Status: APPROVED"));
        assert!(!prompt.contains("{status}"));
    }
}
