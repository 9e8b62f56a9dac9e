//! Chat Completions Client
//!
//! Implementation of `InferenceClient` for OpenAI-compatible
//! `/chat/completions` endpoints such as GitHub Models.

use std::time::Duration;

use async_trait::async_trait;
use inference_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{
        CallMode, Completion, FinishReason, GenerationOptions, InferenceClient, ResponseFormat,
        TokenUsage,
    },
    tool::{FunctionSchema, ToolCall},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default GitHub Models inference endpoint
pub const DEFAULT_ENDPOINT: &str = "https://models.github.ai/inference";

/// Chat completions client configuration
#[derive(Clone, Debug)]
pub struct ChatCompletionsConfig {
    /// Base URL; `/chat/completions` is appended
    pub endpoint: String,

    /// Bearer token
    pub token: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            token: String::new(),
            timeout_secs: 120,
        }
    }
}

/// OpenAI-compatible chat completions client
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    config: ChatCompletionsConfig,
}

impl ChatCompletionsClient {
    /// Create a client for an endpoint and token
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::from_config(ChatCompletionsConfig {
            endpoint: endpoint.into(),
            token: token.into(),
            ..Default::default()
        })
    }

    /// Create from configuration
    pub fn from_config(config: ChatCompletionsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("ai-inference/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::Provider(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    /// Convert conversation messages to the wire format
    fn convert_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| match m {
                Message::System { content } => ApiMessage::text("system", content),
                Message::User { content } => ApiMessage::text("user", content),
                Message::Assistant {
                    content,
                    tool_calls,
                } => ApiMessage {
                    role: "assistant",
                    content: content.clone(),
                    tool_calls: (!tool_calls.is_empty())
                        .then(|| tool_calls.iter().map(ApiToolCall::from).collect()),
                    tool_call_id: None,
                    name: None,
                },
                Message::Tool {
                    tool_call_id,
                    name,
                    content,
                } => ApiMessage {
                    role: "tool",
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: Some(tool_call_id.clone()),
                    name: Some(name.clone()),
                },
            })
            .collect()
    }

    /// Build the request body for one call
    fn build_request<'a>(
        messages: &[Message],
        options: &'a GenerationOptions,
        mode: CallMode<'a>,
    ) -> ChatRequest<'a> {
        let tools = mode.tools();

        ChatRequest {
            messages: Self::convert_messages(messages),
            model: &options.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            tools: (!tools.is_empty()).then_some(tools),
            response_format: mode.response_format(),
        }
    }

    /// Convert the first choice of a response into a completion
    fn convert_completion(response: ChatResponse, model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("no choices in response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, call)| call.into_tool_call(index))
            .collect();

        Ok(Completion {
            content: choice.message.content,
            tool_calls,
            model: response.model.unwrap_or_else(|| model.to_string()),
            usage: response.usage,
            finish_reason: choice.finish_reason,
        })
    }
}

#[async_trait]
impl InferenceClient for ChatCompletionsClient {
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
        mode: CallMode<'_>,
    ) -> Result<Completion> {
        let body = Self::build_request(messages, options, mode);

        debug!(
            model = %options.model,
            messages = messages.len(),
            tools = body.tools.map_or(0, <[FunctionSchema]>::len),
            response_format = ?body.response_format.map(ResponseFormat::kind),
            "Sending completion request"
        );

        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Inference endpoint returned an error");
            return Err(AgentError::UnexpectedResponse {
                status: status.as_u16(),
                detail: error_detail(&text, status),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            AgentError::Provider(format!("malformed response body ({status}): {e}"))
        })?;

        Self::convert_completion(parsed, &options.model)
    }
}

/// Extract the server-supplied error message from an error body
fn error_detail(body: &str, status: reqwest::StatusCode) -> String {
    let from_json = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error.and_then(|e| e.message).or(b.message));

    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ApiMessage>,
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [FunctionSchema]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl ApiMessage {
    fn text(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: ApiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    /// A JSON string per the protocol; some servers send an object instead
    #[serde(default)]
    arguments: serde_json::Value,
}

fn function_type() -> String {
    "function".into()
}

impl From<&ToolCall> for ApiToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_type(),
            function: ApiFunctionCall {
                name: call.name.clone(),
                arguments: serde_json::Value::String(call.arguments.clone()),
            },
        }
    }
}

impl ApiToolCall {
    fn into_tool_call(self, index: usize) -> ToolCall {
        let arguments = match self.function.arguments {
            serde_json::Value::String(raw) => raw,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        let id = if self.id.is_empty() {
            format!("call_{index}")
        } else {
            self.id
        };

        ToolCall {
            id,
            name: self.function.name,
            arguments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<ApiErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}
