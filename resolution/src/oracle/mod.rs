//! The judgment oracle, the external capability that decides whether a candidate
//! list contains what the user asked for.
//!
//! Every response crosses [`JudgmentVerdict::from_json`] or
//! [`JudgmentVerdict::validate`] before the escalation engine acts on it, so a
//! partial or contradictory verdict ends the resolution instead of being
//! patched up with defaults.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::search::SearchItem;

/// The oracle's answer for one escalation round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct JudgmentVerdict {
    /// Whether one of the candidates is the requested file or folder.
    pub satisfied: bool,
    /// Regular expression for the next, broader search; may be empty.
    #[serde(alias = "regex")]
    pub pattern: String,
    /// Exact path of the match; empty unless `satisfied`.
    pub target_path: String,
}

impl JudgmentVerdict {
    pub fn matched(target_path: impl Into<String>) -> Self {
        Self {
            satisfied: true,
            pattern: String::new(),
            target_path: target_path.into(),
        }
    }

    pub fn refine(pattern: impl Into<String>) -> Self {
        Self {
            satisfied: false,
            pattern: pattern.into(),
            target_path: String::new(),
        }
    }

    /// Strictly parse a verdict: all three fields present, nothing else.
    pub fn from_json(raw: &str) -> Result<Self, OracleError> {
        let verdict: Self =
            serde_json::from_str(raw).map_err(|e| OracleError::Malformed(e.to_string()))?;
        verdict.validate()?;
        Ok(verdict)
    }

    /// Reject verdicts that claim a match without saying where it is.
    pub fn validate(&self) -> Result<(), OracleError> {
        if self.satisfied && self.target_path.trim().is_empty() {
            return Err(OracleError::EmptyTargetPath);
        }
        Ok(())
    }

    /// JSON Schema for structured-output requests.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(JudgmentVerdict);
        serde_json::to_value(schema).unwrap_or_default()
    }
}

/// External judgment capability consulted once per escalation round.
#[async_trait]
pub trait JudgmentOracle: Send + Sync {
    /// Decide whether `candidates` satisfy `task`.
    async fn judge(
        &self,
        task: &str,
        candidates: &[SearchItem],
    ) -> Result<JudgmentVerdict, OracleError>;

    /// Rewrite a noisy request into a concise file-finding request.
    ///
    /// The default keeps the task as given.
    async fn refine_task(&self, task: &str) -> Result<String, OracleError> {
        Ok(task.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_verdict() {
        let v = JudgmentVerdict::from_json(
            r#"{"satisfied": false, "pattern": ".*report.*\\.docx", "target_path": ""}"#,
        )
        .unwrap();
        assert_eq!(v, JudgmentVerdict::refine(r".*report.*\.docx"));
    }

    #[test]
    fn test_legacy_regex_key_accepted() {
        let v = JudgmentVerdict::from_json(
            r#"{"regex": "wechat", "satisfied": false, "target_path": ""}"#,
        )
        .unwrap();
        assert_eq!(v.pattern, "wechat");
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = JudgmentVerdict::from_json(r#"{"satisfied": false, "pattern": "x"}"#).unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
        assert!(err.to_string().contains("target_path"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = JudgmentVerdict::from_json(
            r#"{"satisfied": false, "pattern": "", "target_path": "", "confidence": 0.4}"#,
        )
        .unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    #[test]
    fn test_satisfied_without_path_rejected() {
        let err = JudgmentVerdict::from_json(
            r#"{"satisfied": true, "pattern": "", "target_path": "  "}"#,
        )
        .unwrap_err();
        assert!(matches!(err, OracleError::EmptyTargetPath));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = JudgmentVerdict::json_schema();
        let required: Vec<_> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        for field in ["satisfied", "pattern", "target_path"] {
            assert!(required.contains(&field), "{field} not required");
        }
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
    }
}
