//! HTTP completion clients for the supported LLM providers.

use super::{CompletionRequest, LlmCompletionClient};
use crate::config::{LlmConfig, LlmProvider};
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::time::Duration;

/// Name under which the report schema is registered with OpenAI.
const OPENAI_SCHEMA_NAME: &str = "relationship_report";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Build the completion client described by config.
pub fn create_completion_client(llm: &LlmConfig) -> Result<Box<dyn LlmCompletionClient>> {
    llm.validate()?;
    Ok(Box::new(HttpLlmClient::new(llm)?))
}

/// Blocking client: each call runs on a private single-threaded runtime.
pub struct HttpLlmClient {
    model: String,
    provider: LlmProvider,
    endpoint: String,
    api_key: Option<String>,
    max_output_tokens: u32,
    runtime: tokio::runtime::Runtime,
    http: reqwest::Client,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Self::with_api_key(config, config.resolve_api_key())
    }

    /// Build with an already resolved key; blank keys count as missing.
    fn with_api_key(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| config.provider.default_endpoint().to_string())
            .trim_end_matches('/')
            .to_string();
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if config.provider.api_key_env().is_some() && api_key.is_none() {
            return Err(Error::Config(
                "llm.api_key (or provider env var) is required".to_string(),
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Config(format!("failed to build tokio runtime: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            model: config.model.clone(),
            provider: config.provider,
            endpoint,
            api_key,
            max_output_tokens: config.max_output_tokens,
            runtime,
            http,
        })
    }

    fn label(&self) -> &'static str {
        match self.provider {
            LlmProvider::Ollama => "ollama",
            LlmProvider::Claude => "claude",
            LlmProvider::OpenAI => "openai",
            LlmProvider::Gemini => "gemini",
        }
    }

    fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    /// POST `body` and decode the provider envelope.
    async fn post(&self, url: String, headers: HeaderMap, body: Value) -> Result<Value> {
        let label = self.label();
        let resp = self
            .http
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{label} request failed: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("{label} read body failed: {e}")))?;
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "{label} returned {}: {}",
                status.as_u16(),
                text
            )));
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::Content(format!("{label} response is not JSON: {e}")))
    }

    fn request_body(&self, request: &CompletionRequest<'_>) -> Value {
        match self.provider {
            LlmProvider::Ollama => json!({
                "model": self.model,
                "system": request.system,
                "prompt": request.prompt,
                "format": request.schema,
                "stream": false,
                "options": { "temperature": 0 },
            }),
            LlmProvider::Claude => json!({
                "model": self.model,
                "max_tokens": self.max_output_tokens,
                "temperature": 0,
                "system": format!(
                    "{}\n\nThe JSON object must validate against this JSON schema:\n{}",
                    request.system, request.schema
                ),
                "messages": [{ "role": "user", "content": request.prompt }],
            }),
            LlmProvider::OpenAI => json!({
                "model": self.model,
                "max_completion_tokens": self.max_output_tokens,
                "messages": [
                    { "role": "system", "content": request.system },
                    { "role": "user", "content": request.prompt }
                ],
                "response_format": {
                    "type": "json_schema",
                    "json_schema": { "name": OPENAI_SCHEMA_NAME, "schema": request.schema },
                },
            }),
            LlmProvider::Gemini => json!({
                "systemInstruction": { "parts": [{ "text": request.system }] },
                "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseJsonSchema": request.schema,
                    "maxOutputTokens": self.max_output_tokens,
                },
            }),
        }
    }

    fn url(&self) -> String {
        match self.provider {
            LlmProvider::Ollama => format!("{}/api/generate", self.endpoint),
            LlmProvider::Claude => format!("{}/v1/messages", self.endpoint),
            LlmProvider::OpenAI => format!("{}/v1/chat/completions", self.endpoint),
            LlmProvider::Gemini => format!(
                "{}/v1beta/models/{}:generateContent",
                self.endpoint, self.model
            ),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let invalid_key = |e: reqwest::header::InvalidHeaderValue| {
            Error::Config(format!("invalid {} api key header: {e}", self.label()))
        };
        match self.provider {
            LlmProvider::Ollama => {}
            LlmProvider::Claude => {
                headers.insert(
                    HeaderName::from_static("x-api-key"),
                    HeaderValue::from_str(self.api_key()).map_err(invalid_key)?,
                );
                headers.insert(
                    HeaderName::from_static("anthropic-version"),
                    HeaderValue::from_static(ANTHROPIC_VERSION),
                );
            }
            LlmProvider::OpenAI => {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", self.api_key()))
                        .map_err(invalid_key)?,
                );
            }
            LlmProvider::Gemini => {
                headers.insert(
                    HeaderName::from_static("x-goog-api-key"),
                    HeaderValue::from_str(self.api_key()).map_err(invalid_key)?,
                );
            }
        }
        Ok(headers)
    }
}

impl LlmCompletionClient for HttpLlmClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let url = self.url();
        let headers = self.headers()?;
        let body = self.request_body(request);

        tracing::debug!(provider = self.label(), model = %self.model, "Sending completion request");
        let envelope = self.runtime.block_on(self.post(url, headers, body))?;

        match self.provider {
            LlmProvider::Ollama => ollama_text(&envelope),
            LlmProvider::Claude => claude_text(&envelope),
            LlmProvider::OpenAI => openai_text(&envelope),
            LlmProvider::Gemini => gemini_text(&envelope),
        }
    }
}

fn ollama_text(json: &Value) -> Result<String> {
    json.get("response")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| Error::Content("ollama response missing string field `response`".into()))
}

fn claude_text(json: &Value) -> Result<String> {
    if json.get("stop_reason").and_then(Value::as_str) == Some("refusal") {
        return Err(Error::Content("claude refused the request".into()));
    }
    let text: String = json
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    if text.is_empty() {
        return Err(Error::Content("claude response missing text content".into()));
    }
    Ok(text)
}

fn openai_text(json: &Value) -> Result<String> {
    let choice = json
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| Error::Content("openai response has no choices".into()))?;

    if choice.get("finish_reason").and_then(Value::as_str) == Some("content_filter") {
        return Err(Error::Content("openai response blocked by content filter".into()));
    }
    let message = choice.get("message");
    if let Some(refusal) = message
        .and_then(|m| m.get("refusal"))
        .and_then(Value::as_str)
    {
        return Err(Error::Content(format!("openai refused the request: {refusal}")));
    }
    message
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| Error::Content("openai response missing choices[0].message.content".into()))
}

fn gemini_text(json: &Value) -> Result<String> {
    if let Some(reason) = json
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(Value::as_str)
    {
        return Err(Error::Content(format!("gemini blocked the prompt: {reason}")));
    }

    let candidate = json
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| Error::Content("gemini response has no candidates".into()))?;

    if let Some(reason @ ("SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "RECITATION")) =
        candidate.get("finishReason").and_then(Value::as_str)
    {
        return Err(Error::Content(format!("gemini stopped generation: {reason}")));
    }

    let text: String = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    if text.is_empty() {
        return Err(Error::Content("gemini response missing text parts".into()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            provider,
            model: "test-model".to_string(),
            endpoint: Some("http://localhost:9/".to_string()),
            api_key: Some("secret".to_string()),
            timeout_secs: 5,
            max_output_tokens: 1234,
        }
    }

    fn request_for(provider: LlmProvider) -> (String, Value) {
        let client = HttpLlmClient::new(&config(provider)).unwrap();
        let schema = json!({ "type": "object" });
        let request = CompletionRequest {
            system: "sys",
            prompt: "transcript",
            schema: &schema,
        };
        (client.url(), client.request_body(&request))
    }

    #[test]
    fn urls_per_provider() {
        assert_eq!(request_for(LlmProvider::Ollama).0, "http://localhost:9/api/generate");
        assert_eq!(request_for(LlmProvider::Claude).0, "http://localhost:9/v1/messages");
        assert_eq!(
            request_for(LlmProvider::OpenAI).0,
            "http://localhost:9/v1/chat/completions"
        );
        assert_eq!(
            request_for(LlmProvider::Gemini).0,
            "http://localhost:9/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn schema_is_attached_to_every_request() {
        let (_, ollama) = request_for(LlmProvider::Ollama);
        assert_eq!(ollama["format"]["type"], "object");

        let (_, openai) = request_for(LlmProvider::OpenAI);
        assert_eq!(openai["response_format"]["json_schema"]["schema"]["type"], "object");
        assert_eq!(openai["max_completion_tokens"], 1234);

        let (_, gemini) = request_for(LlmProvider::Gemini);
        assert_eq!(
            gemini["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(gemini["generationConfig"]["responseJsonSchema"]["type"], "object");

        let (_, claude) = request_for(LlmProvider::Claude);
        assert!(claude["system"].as_str().unwrap().contains("\"type\":\"object\""));
    }

    #[test]
    fn hosted_provider_without_key_is_rejected() {
        for provider in [LlmProvider::Claude, LlmProvider::OpenAI, LlmProvider::Gemini] {
            let cfg = config(provider);
            for missing in [None, Some(String::new()), Some("  ".to_string())] {
                let result = HttpLlmClient::with_api_key(&cfg, missing.clone());
                assert!(
                    matches!(result, Err(Error::Config(_))),
                    "{provider:?} accepted key {missing:?}"
                );
            }
            assert!(HttpLlmClient::with_api_key(&cfg, Some("secret".into())).is_ok());
        }
    }

    #[test]
    fn local_provider_needs_no_key() {
        let cfg = config(LlmProvider::Ollama);
        let client = HttpLlmClient::with_api_key(&cfg, None).unwrap();
        assert_eq!(client.api_key(), "");
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let client = HttpLlmClient::new(&config(LlmProvider::Ollama)).unwrap();
        let schema = json!({});
        let result = client.complete(&CompletionRequest {
            system: "s",
            prompt: "p",
            schema: &schema,
        });
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn extracts_text_from_envelopes() {
        assert_eq!(ollama_text(&json!({ "response": "{}" })).unwrap(), "{}");
        assert_eq!(
            claude_text(&json!({ "content": [{ "type": "text", "text": "{\"a\":1}" }] })).unwrap(),
            "{\"a\":1}"
        );
        assert_eq!(
            openai_text(&json!({ "choices": [{ "message": { "content": "{}" } }] })).unwrap(),
            "{}"
        );
        assert_eq!(
            gemini_text(&json!({
                "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
            }))
            .unwrap(),
            "{\"a\":1}"
        );
    }

    #[test]
    fn refusals_and_blocks_are_content_errors() {
        assert!(matches!(
            gemini_text(&json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
            Err(Error::Content(_))
        ));
        assert!(matches!(
            gemini_text(&json!({ "candidates": [{ "finishReason": "SAFETY" }] })),
            Err(Error::Content(_))
        ));
        assert!(matches!(
            openai_text(&json!({
                "choices": [{ "message": { "content": null, "refusal": "no" } }]
            })),
            Err(Error::Content(_))
        ));
        assert!(matches!(
            claude_text(&json!({ "stop_reason": "refusal", "content": [] })),
            Err(Error::Content(_))
        ));
        assert!(matches!(ollama_text(&json!({})), Err(Error::Content(_))));
    }
}
