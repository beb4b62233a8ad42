use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::contract::Analyzer;
use crate::error::{PipelineError, Result};

/// Analyzer backed by a chat-completions language-model endpoint.
pub struct LlmAnalyzer {
    client: reqwest::Client,
    config: AnalyzerConfig,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl LlmAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PipelineError::Config("LLM_API_KEY is not set".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn build_prompt(code: &str, filename: &str) -> String {
        format!(
            r#"You are a technical documentation expert. Analyze this code file and generate API documentation.

FILENAME: {filename}

CODE:
{code}

Generate documentation in JSON format with the following structure:
{{
  "functions": [
    {{
      "name": "functionName",
      "parameters": ["param1: type", "param2: type"],
      "returnType": "type",
      "description": "what it does",
      "example": "code example"
    }}
  ],
  "classes": [...],
  "exports": [...]
}}

Return ONLY valid JSON, no markdown formatting."#
        )
    }

    fn analysis_error(file: &str, reason: impl Into<String>) -> PipelineError {
        PipelineError::AnalysisError {
            file: file.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    async fn analyze(&self, content: &str, filename: &str) -> Result<serde_json::Value> {
        let prompt = Self::build_prompt(content, filename);
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "temperature": self.config.temperature,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Self::analysis_error(filename, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::analysis_error(
                filename,
                format!("upstream returned {status}: {body}"),
            ));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Self::analysis_error(filename, format!("malformed response: {e}")))?;

        let message = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| Self::analysis_error(filename, "response contained no choices"))?;

        debug!(file = filename, response_len = message.len(), "Received analysis response");

        let raw = extract_json_object(message)
            .ok_or_else(|| Self::analysis_error(filename, "no JSON object in response"))?;

        serde_json::from_str(raw)
            .map_err(|e| Self::analysis_error(filename, format!("unparseable JSON payload: {e}")))
    }
}

/// Locate the first balanced `{...}` region in free-form model output.
///
/// Best-effort by design: the scan counts braces without tracking string
/// literals, so a brace inside a quoted string can unbalance it. Callers
/// treat a miss (or a region that fails JSON parsing) as `AnalysisError`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
