//! LLM-backed collaborator: LlmCollaborator, LlmClient trait, AnthropicClient.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collaborator::GenerationCollaborator;
use crate::error::GenerationError;
use crate::state::Validation;

/// Error type for LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Network or HTTP error.
    #[error("LLM network error: {0}")]
    Network(String),
    /// The API answered with an error status.
    #[error("LLM API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// The API response body could not be read.
    #[error("LLM parse error: {0}")]
    Parse(String),
    #[error("ANTHROPIC_API_KEY environment variable not set")]
    MissingApiKey,
}

/// A message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for calling an LLM to get a text completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: Vec<Message>, model: &str) -> Result<String, LlmError>;
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();

    if let Some(inner) = trimmed
        .strip_prefix("```json")
        .and_then(|rest| rest.strip_suffix("```"))
    {
        return inner.trim();
    }
    if let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    {
        return inner.trim();
    }
    trimmed
}

const HYPOTHESIS_PROMPT: &str = r#"You are a performance marketing analyst.
You receive a question and a JSON analysis comparing the last 7 days of ad
performance with the preceding baseline, plus any statistical drift warnings.

Respond with a JSON object in exactly this format:
{
  "summary": "<one or two sentence diagnosis>",
  "primary_driver": "<metric name from the analysis>",
  "root_cause": "<short root cause>",
  "evidence": [
    {"metric": "<metric name>", "direction": "increase|decrease|flat", "delta_percent": <number>}
  ],
  "drift_warnings": ["<column names from drift_warnings you rely on>"],
  "confidence": <number between 0 and 1>
}

Rules:
- Only cite metrics that appear in the analysis ("roas" included).
- Directions must match the sign of delta_percent.
- Respond only with valid JSON. Do not include markdown fences or other text."#;

const VALIDATION_PROMPT: &str = r#"You are a skeptical reviewer of marketing diagnoses.
You receive a hypothesis and the JSON analysis it claims to explain.
Check every cited metric and direction against the analysis.

Respond with a JSON object in exactly this format:
{
  "is_valid": true|false,
  "critique": "<what is wrong, or why it holds>",
  "confidence": <number between 0 and 1>
}

Respond only with valid JSON. Do not include markdown fences or other text."#;

const CREATIVE_PROMPT: &str = r#"You are a direct-response copywriter.
You receive a validated diagnosis of an ad performance problem and a list of
variant names. Write one ad per variant that addresses the diagnosed driver.

Respond with a JSON array in exactly this format:
[
  {"variant": "<variant name>", "headline": "<max 40 chars>", "primary_text": "<max 125 chars>", "call_to_action": "<button label>"}
]

Respond only with valid JSON. Do not include markdown fences or other text."#;

/// A collaborator that asks an LLM for each generation step.
///
/// Responses that do not parse as the expected JSON are sent back with a
/// correction request, up to `max_retries` times.
pub struct LlmCollaborator {
    pub client: Box<dyn LlmClient>,
    /// Model identifier (e.g., "claude-sonnet-4-20250514").
    pub model: String,
    pub max_retries: usize,
}

impl LlmCollaborator {
    pub fn new(client: Box<dyn LlmClient>, model: String) -> Self {
        Self {
            client,
            model,
            max_retries: 2,
        }
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        what: &'static str,
        system: &str,
        user: String,
    ) -> Result<T, GenerationError> {
        let mut messages = vec![Message::system(system), Message::user(user)];

        let mut attempt = 0;
        loop {
            let response = self.client.complete(messages.clone(), &self.model).await?;

            let parse_error = match serde_json::from_str::<T>(strip_code_fences(&response)) {
                Ok(parsed) => return Ok(parsed),
                Err(e) => e.to_string(),
            };

            if attempt >= self.max_retries {
                tracing::warn!(what, attempts = attempt + 1, error = %parse_error, "giving up on LLM response");
                return Err(GenerationError::Malformed {
                    what,
                    message: parse_error,
                });
            }
            attempt += 1;
            tracing::debug!(what, attempt, error = %parse_error, "LLM response rejected, retrying");

            messages.push(Message::assistant(response));
            messages.push(Message::user(format!(
                "Your response was invalid: {parse_error}. Please try again, responding with valid JSON only."
            )));
        }
    }
}

#[async_trait]
impl GenerationCollaborator for LlmCollaborator {
    async fn generate_hypothesis(
        &self,
        query: &str,
        analysis_json: &str,
        critique: Option<&str>,
    ) -> Result<Value, GenerationError> {
        let mut user = format!("Question: {query}\n\nAnalysis:\n{analysis_json}");
        if let Some(critique) = critique {
            user.push_str(&format!(
                "\n\nA reviewer rejected your previous hypothesis: {critique}\nAddress this in the new hypothesis."
            ));
        }
        let hypothesis: Value = self
            .complete_json("hypothesis", HYPOTHESIS_PROMPT, user)
            .await?;
        if !hypothesis.is_object() {
            return Err(GenerationError::Malformed {
                what: "hypothesis",
                message: "expected a JSON object".to_string(),
            });
        }
        Ok(hypothesis)
    }

    async fn validate_hypothesis(
        &self,
        hypothesis: &Value,
        analysis_json: &str,
    ) -> Result<Validation, GenerationError> {
        let user = format!("Hypothesis:\n{hypothesis}\n\nAnalysis:\n{analysis_json}");
        self.complete_json("validation", VALIDATION_PROMPT, user)
            .await
    }

    async fn generate_creatives(
        &self,
        hypothesis: &Value,
        variants: &[String],
    ) -> Result<Value, GenerationError> {
        let variants = serde_json::to_string(variants).unwrap_or_else(|_| "[]".to_string());
        let user = format!("Diagnosis:\n{hypothesis}\n\nVariants: {variants}");
        let creatives: Vec<Value> = self
            .complete_json("creatives", CREATIVE_PROMPT, user)
            .await?;
        Ok(Value::Array(creatives))
    }
}

// -- AnthropicClient (feature-gated) --

#[cfg(feature = "anthropic")]
/// LLM client for the Anthropic Messages API.
///
/// Uses `ureq` for HTTP. Reads the API key from the `ANTHROPIC_API_KEY`
/// environment variable.
pub struct AnthropicClient {
    pub api_key: String,
    /// Base URL (default: https://api.anthropic.com).
    pub base_url: String,
    pub max_tokens: u32,
}

#[cfg(feature = "anthropic")]
impl AnthropicClient {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| LlmError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 2048,
        }
    }
}

#[cfg(feature = "anthropic")]
#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, messages: Vec<Message>, model: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.clone();
        let url = format!("{}/v1/messages", self.base_url);

        // The Messages API takes the system prompt as a separate field.
        let system: Option<String> = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.clone());
        let conversation: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
            .collect();

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": self.max_tokens,
            "messages": conversation,
        });
        if let Some(sys) = system {
            body["system"] = Value::String(sys);
        }

        // ureq is blocking; keep it off the async executor.
        tokio::task::spawn_blocking(move || {
            let agent = ureq::Agent::new_with_defaults();
            let response = agent
                .post(&url)
                .header("x-api-key", &api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .send_json(body);

            match response {
                Ok(resp) => {
                    let json: Value = resp.into_body().read_json().map_err(|e| {
                        LlmError::Parse(format!("Failed to parse Anthropic response: {e}"))
                    })?;
                    json["content"]
                        .as_array()
                        .and_then(|arr| arr.first())
                        .and_then(|c| c["text"].as_str())
                        .map(str::to_string)
                        .ok_or_else(|| {
                            LlmError::Parse("No text content in Anthropic response".to_string())
                        })
                }
                Err(ureq::Error::StatusCode(status)) => Err(LlmError::Api {
                    status,
                    message: "request rejected".to_string(),
                }),
                Err(e) => Err(LlmError::Network(e.to_string())),
            }
        })
        .await
        .map_err(|e| LlmError::Network(format!("Task join error: {e}")))?
    }
}
