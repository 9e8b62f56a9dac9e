//! Inference Client Strategy
//!
//! Defines the single-shot completion interface the loop drives. One call is
//! one request/response exchange with the model endpoint; retries, if any,
//! belong to the caller.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use inference_core::provider::{CallMode, GenerationOptions, InferenceClient};
//!
//! let client = ChatCompletionsClient::new(endpoint, token)?;
//! let completion = client
//!     .complete(conversation.messages(), &options, CallMode::FinalFormat(None))
//!     .await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{FunctionSchema, ToolCall};

/// Model used when neither the caller nor the prompt file names one
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

/// Default completion budget
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Configuration for LLM generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "openai/gpt-4o")
    pub model: String,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for sampling, left to the endpoint when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-p nucleus sampling, left to the endpoint when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

fn default_max_tokens() -> u32 { DEFAULT_MAX_TOKENS }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            max_tokens: default_max_tokens(),
            temperature: None,
            top_p: None,
        }
    }
}

/// Structured-output constraint for the final answer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Content must satisfy the embedded JSON schema definition
    JsonSchema { json_schema: serde_json::Value },
}

impl ResponseFormat {
    /// Wire name of the format, as used in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseFormat::JsonSchema { .. } => "json_schema",
        }
    }
}

/// Optional parameters attached to one completion call.
///
/// Tool declarations and a response format are never sent together.
#[derive(Clone, Copy, Debug)]
pub enum CallMode<'a> {
    /// Expose the tool catalog; no structured-output constraint
    WithTools(&'a [FunctionSchema]),
    /// No tools; attach the response format when one was requested
    FinalFormat(Option<&'a ResponseFormat>),
}

impl<'a> CallMode<'a> {
    pub fn tools(&self) -> &'a [FunctionSchema] {
        match *self {
            CallMode::WithTools(tools) => tools,
            CallMode::FinalFormat(_) => &[],
        }
    }

    pub fn response_format(&self) -> Option<&'a ResponseFormat> {
        match *self {
            CallMode::WithTools(_) => None,
            CallMode::FinalFormat(format) => format,
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text, absent when the model only requested tools
    pub content: Option<String>,

    /// Tool invocations requested by the model
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    /// Model that generated this response
    #[serde(default)]
    pub model: String,

    /// Token usage statistics (if available)
    #[serde(default)]
    pub usage: Option<TokenUsage>,

    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// Plain text completion without tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Completion that only requests tool calls
    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            finish_reason: Some(FinishReason::ToolCalls),
            ..Default::default()
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    #[serde(other)]
    Other,
}

/// Strategy trait for inference endpoints
///
/// The loop works exclusively through this interface, which keeps it
/// testable against scripted clients.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Issue exactly one completion request
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
        mode: CallMode<'_>,
    ) -> Result<Completion>;
}
