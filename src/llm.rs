//! Language model client for structured summaries.
//!
//! [`LanguageModel`] is the seam the summarize stage depends on. [`GeminiClient`]
//! talks to the Gemini `generateContent` REST endpoint and asks for a JSON body
//! matching a response schema.

use crate::error::{DigestError, OptionExt, Result};
use crate::state::TokenUsage;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the Gemini endpoint
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";

/// Default Gemini REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Raw model output plus the tokens it cost
#[derive(Debug, Clone)]
pub struct Completion {
    /// JSON-encoded payload conforming to the requested schema
    pub body: String,
    pub usage: TokenUsage,
}

/// A model that can answer a prompt under a JSON response schema
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<Completion>;
}

/// Gemini REST client.
///
/// The API key is resolved on every request, so a missing key only fails the
/// individual call rather than client construction.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Client for `model`, endpoint from `GEMINI_BASE_URL` or the public default
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(model, base_url)
    }

    pub fn with_base_url(model: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DigestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
        })
    }

    /// Use a fixed key instead of reading `GEMINI_API_KEY`
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn resolve_api_key(&self) -> Result<String> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DigestError::Config(format!("{} is not set", API_KEY_ENV)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<Completion> {
        let api_key = self.resolve_api_key()?;

        let request_body = serde_json::json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt}]}
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });

        let api_url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Sending Gemini request");

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DigestError::Api {
                code: status.as_u16(),
                message: format!("Gemini API error: {} - {}", status, error_text),
            });
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| DigestError::Parse(format!("Failed to parse Gemini response: {}", e)))?;

        let usage = api_response
            .usage_metadata
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        let body = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_parse("Gemini response contained no text candidate")?;

        Ok(Completion { body, usage })
    }
}

/// Extract JSON from LLM response (handles markdown code blocks)
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_end();
        let rest = rest.strip_suffix("```").unwrap_or(rest);
        return rest.trim();
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::summary_schema;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_json_plain() {
        let input = r#"{"summary": "A study."}"#;
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn test_extract_json_code_block() {
        let input = "```json\n{\"summary\": \"A study.\"}\n```";
        assert_eq!(extract_json(input), r#"{"summary": "A study."}"#);
    }

    #[test]
    fn test_extract_json_with_text() {
        let input = r#"Here you go: {"summary": "A study."} Thanks"#;
        assert_eq!(extract_json(input), r#"{"summary": "A study."}"#);
    }

    #[tokio::test]
    async fn test_generate_structured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [
                    {"content": {"role": "model", "parts": [{"text": "{\"summary\": \"Findings.\"}"}]}}
                ],
                "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 30, "totalTokenCount": 150}
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url("gemini-test", server.uri())
            .expect("Failed to build client")
            .with_api_key("test-key");

        let completion = client
            .generate_structured("Summarize this", &summary_schema())
            .await
            .expect("Request failed");

        assert_eq!(completion.body, r#"{"summary": "Findings."}"#);
        assert_eq!(completion.usage.total_tokens, 150);
        assert_eq!(completion.usage.completion_tokens, 30);
    }

    #[tokio::test]
    async fn test_generate_structured_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url("gemini-test", server.uri())
            .expect("Failed to build client")
            .with_api_key("test-key");

        let err = client
            .generate_structured("Summarize this", &summary_schema())
            .await
            .expect_err("Expected API error");
        assert!(matches!(err, DigestError::Api { code: 429, .. }));
    }

    #[tokio::test]
    async fn test_generate_structured_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url("gemini-test", server.uri())
            .expect("Failed to build client")
            .with_api_key("test-key");

        let err = client
            .generate_structured("Summarize this", &summary_schema())
            .await
            .expect_err("Expected parse error");
        assert!(matches!(err, DigestError::Parse(_)));
    }
}
