//! HTTP judgment oracle over an OpenAI-compatible chat-completions API.
//!
//! The verdict schema is sent as `response_format` so backends with
//! structured-output support return exactly the three verdict keys. Replies
//! are still parsed strictly; a backend that ignores the schema and answers
//! in prose yields `OracleError::Malformed`.

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use resolution::error::OracleError;
use resolution::{JudgmentOracle, JudgmentVerdict, SearchItem};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::OracleSection;
use crate::prompts;

/// Judge backed by a chat-completions endpoint.
pub struct HttpOracle {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    client: reqwest::Client,
}

impl HttpOracle {
    pub fn new(section: &OracleSection) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(section.timeout_secs))
            .build()
            .context("Failed to build oracle HTTP client")?;
        Ok(Self {
            endpoint: format!("{}/chat/completions", section.url.trim_end_matches('/')),
            model: section.model.clone(),
            api_key: section.api_key.clone().filter(|k| !k.is_empty()),
            temperature: section.temperature,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request body for one judgment round.
    pub fn judge_request(&self, task: &str, candidates: &[SearchItem]) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompts::judge_system_prompt(task)},
                {"role": "user", "content": prompts::candidates_message(candidates)}
            ],
            "temperature": self.temperature,
            "response_format": verdict_response_format(),
        })
    }

    /// Request body for the task refinement pre-pass.
    pub fn refine_request(&self, task: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompts::REFINE_INSTRUCTIONS},
                {"role": "user", "content": task}
            ],
            "temperature": self.temperature,
        })
    }

    async fn complete(&self, body: &Value) -> Result<Value, OracleError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| OracleError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Unreachable(format!(
                "oracle API error ({status}): {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl JudgmentOracle for HttpOracle {
    async fn judge(
        &self,
        task: &str,
        candidates: &[SearchItem],
    ) -> Result<JudgmentVerdict, OracleError> {
        let start = Instant::now();
        let completion = self.complete(&self.judge_request(task, candidates)).await?;
        let verdict = verdict_from_completion(&completion)?;
        info!(
            model = %self.model,
            prompt_version = prompts::PROMPT_VERSION,
            satisfied = verdict.satisfied,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Oracle judged candidates"
        );
        Ok(verdict)
    }

    async fn refine_task(&self, task: &str) -> Result<String, OracleError> {
        let completion = self.complete(&self.refine_request(task)).await?;
        let refined = message_content(&completion)?
            .trim()
            .trim_matches('"')
            .trim()
            .to_string();
        if refined.is_empty() {
            return Err(OracleError::Malformed("empty refinement".into()));
        }
        Ok(refined)
    }
}

/// `response_format` block constraining replies to the verdict schema.
pub fn verdict_response_format() -> Value {
    let mut schema = JudgmentVerdict::json_schema();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
    }
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "judgment_verdict",
            "strict": true,
            "schema": schema,
        }
    })
}

/// Extract and strictly parse the verdict from a chat-completions reply.
pub fn verdict_from_completion(completion: &Value) -> Result<JudgmentVerdict, OracleError> {
    let content = message_content(completion)?;
    debug!(%content, "Oracle reply");
    JudgmentVerdict::from_json(strip_code_fence(content))
}

fn message_content(completion: &Value) -> Result<&str, OracleError> {
    completion["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| OracleError::Malformed("reply has no message content".into()))
}

/// Some backends wrap JSON in a Markdown fence even in structured mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(content: &str) -> Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    fn oracle() -> HttpOracle {
        HttpOracle::new(&OracleSection {
            url: "http://localhost:9999/v1/".into(),
            api_key: Some(String::new()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_and_empty_key() {
        let o = oracle();
        assert_eq!(o.endpoint(), "http://localhost:9999/v1/chat/completions");
        assert!(o.api_key.is_none());
    }

    #[test]
    fn test_judge_request_shape() {
        let body = oracle().judge_request(
            "open the report",
            &[SearchItem::new("report.docx", "/d/report.docx")],
        );
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("/d/report.docx"));
        let format = &body["response_format"];
        assert_eq!(format["type"], "json_schema");
        let schema = &format["json_schema"]["schema"];
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["additionalProperties"], false);
        assert!(schema["properties"]["target_path"].is_object());
    }

    #[test]
    fn test_verdict_from_completion() {
        let v = verdict_from_completion(&completion(
            r#"{"satisfied": true, "pattern": "", "target_path": "/d/report.docx"}"#,
        ))
        .unwrap();
        assert_eq!(v, JudgmentVerdict::matched("/d/report.docx"));
    }

    #[test]
    fn test_legacy_regex_key_and_fence() {
        let v = verdict_from_completion(&completion(
            "```json\n{\"satisfied\": false, \"regex\": \"report.*\", \"target_path\": \"\"}\n```",
        ))
        .unwrap();
        assert_eq!(v, JudgmentVerdict::refine("report.*"));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = verdict_from_completion(&completion(r#"{"satisfied": false, "pattern": "x"}"#))
            .unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));

        let err = verdict_from_completion(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    #[test]
    fn test_satisfied_without_path_rejected() {
        let err = verdict_from_completion(&completion(
            r#"{"satisfied": true, "pattern": "", "target_path": " "}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, OracleError::EmptyTargetPath));
    }
}
