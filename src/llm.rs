//! Language model completion capability
//!
//! The extraction pipeline only needs "prompt in, text or function call out".
//! [`OpenAiCompatibleClient`] provides that over any chat-completions
//! endpoint speaking the OpenAI wire format.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::LanguageModelConfig;
use crate::http::build_client;
use crate::{Result, WayfinderError};

/// Structured-output contract offered to hosts that support function calling
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// When set, the host is asked to answer with a call to this function
    pub function: Option<FunctionSchema>,
}

/// What the model answered
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Text(String),
    FunctionCall { name: String, arguments: Value },
}

/// "Given a prompt, return a completion." Implementations must not retry.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints
pub struct OpenAiCompatibleClient {
    client: ClientWithMiddleware,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleClient {
    /// Create a client from configuration. Fails without an API key.
    pub fn new(config: &LanguageModelConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| WayfinderError::config("Language model API key is not set"))?;

        // The cascade owns retry policy; a single attempt per call here.
        let client = build_client(Duration::from_millis(config.timeout_ms), 0)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt }
            ]
        });

        if let Some(function) = &request.function {
            body["tools"] = json!([{ "type": "function", "function": function }]);
            body["tool_choice"] = json!({
                "type": "function",
                "function": { "name": function.name }
            });
        }

        body
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        let start_time = Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Language model request failed with {}: {}", status, error_text);
            return Err(match status.as_u16() {
                401 | 403 => WayfinderError::config("Language model rejected the API key"),
                429 => WayfinderError::api("Language model rate limit exceeded"),
                _ => WayfinderError::api(format!("Language model error {status}: {error_text}")),
            });
        }

        let chat: ChatResponse = response.json().await?;
        info!(
            "Language model answered in {:.3}s",
            start_time.elapsed().as_secs_f64()
        );

        chat.into_completion()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCallPayload,
}

#[derive(Debug, Deserialize)]
struct FunctionCallPayload {
    name: String,
    /// JSON-encoded arguments
    arguments: String,
}

impl ChatResponse {
    fn into_completion(self) -> Result<Completion> {
        let message = self
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| WayfinderError::malformed("Language model returned no choices"))?;

        if let Some(call) = message.tool_calls.into_iter().next() {
            debug!("Language model answered with function call '{}'", call.function.name);
            // Arguments that are not valid JSON are passed on as text for repair.
            let arguments = serde_json::from_str(&call.function.arguments)
                .unwrap_or(Value::String(call.function.arguments));
            return Ok(Completion::FunctionCall {
                name: call.function.name,
                arguments,
            });
        }

        message
            .content
            .map(Completion::Text)
            .ok_or_else(|| WayfinderError::malformed("Language model returned an empty message"))
    }
}
