//! Request Assembly
//!
//! Builds the initial conversation and the optional structured-output
//! constraint, either from a structured prompt definition (`.prompt.yml`) or
//! from a plain system/user prompt pair.
//!
//! ## Prompt file
//!
//! ```yaml
//! messages:
//!   - role: system
//!     content: You review pull requests.
//!   - role: user
//!     content: "Summarize: {{diff}}"
//! model: openai/gpt-4o-mini
//! modelParameters:
//!   maxTokens: 500
//! responseFormat: json_schema
//! jsonSchema: |
//!   {"name": "summary", "schema": {"type": "object"}}
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{GenerationOptions, ResponseFormat};
use crate::template::{replace_template_variables, TemplateVariables};

/// System prompt used when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant";

/// Roles a prompt definition may declare
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

/// One message of a prompt definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl From<&PromptMessage> for Message {
    fn from(message: &PromptMessage) -> Self {
        match message.role {
            PromptRole::System => Message::system(message.content.clone()),
            PromptRole::User => Message::user(message.content.clone()),
            PromptRole::Assistant => Message::assistant(message.content.clone()),
        }
    }
}

/// Generation overrides declared by a prompt definition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParameters {
    #[serde(default, alias = "maxCompletionTokens")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

/// Declared output format of a prompt definition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormatKind {
    #[default]
    Text,
    JsonSchema,
}

/// Structured prompt definition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    #[serde(default)]
    pub messages: Vec<PromptMessage>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub model_parameters: Option<ModelParameters>,

    #[serde(default)]
    pub response_format: Option<ResponseFormatKind>,

    /// Serialized JSON schema definition, parsed by [`build_response_format`]
    #[serde(default)]
    pub json_schema: Option<String>,
}

impl PromptConfig {
    /// Parse a prompt definition and substitute template variables in every
    /// message content
    pub fn parse(yaml: &str, vars: &TemplateVariables) -> Result<Self> {
        let mut config: PromptConfig = serde_yml::from_str(yaml)
            .map_err(|e| AgentError::Config(format!("invalid prompt file: {e}")))?;

        for message in &mut config.messages {
            message.content = replace_template_variables(&message.content, vars);
        }

        debug!(messages = config.messages.len(), "Prompt definition parsed");
        Ok(config)
    }

    /// Read and parse a prompt file
    pub fn load(path: &Path, vars: &TemplateVariables) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("cannot read prompt file {}: {e}", path.display()))
        })?;
        Self::parse(&yaml, vars)
    }

    /// Apply the definition's model and parameter overrides
    pub fn apply_to(&self, options: &mut GenerationOptions) {
        if let Some(model) = self.model.as_deref().filter(|m| !m.trim().is_empty()) {
            options.model = model.to_owned();
        }

        if let Some(params) = &self.model_parameters {
            if let Some(max_tokens) = params.max_tokens {
                options.max_tokens = max_tokens;
            }
            if params.temperature.is_some() {
                options.temperature = params.temperature;
            }
            if params.top_p.is_some() {
                options.top_p = params.top_p;
            }
        }
    }
}

/// Whether a path names a structured prompt definition
pub fn is_prompt_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".prompt.yml") || name.ends_with(".prompt.yaml"))
}

/// Build the initial message list.
///
/// A definition with messages is used verbatim; otherwise a system message
/// (defaulting to [`DEFAULT_SYSTEM_PROMPT`]) followed by the user prompt.
pub fn build_messages(
    config: Option<&PromptConfig>,
    system_prompt: Option<&str>,
    prompt: Option<&str>,
) -> Vec<Message> {
    if let Some(config) = config.filter(|c| !c.messages.is_empty()) {
        return config.messages.iter().map(Message::from).collect();
    }

    vec![
        Message::system(system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT)),
        Message::user(prompt.unwrap_or_default()),
    ]
}

/// Build the structured-output constraint declared by a prompt definition
pub fn build_response_format(config: Option<&PromptConfig>) -> Result<Option<ResponseFormat>> {
    let Some(config) = config else {
        return Ok(None);
    };

    if config.response_format != Some(ResponseFormatKind::JsonSchema) {
        return Ok(None);
    }

    let Some(schema) = config.json_schema.as_deref() else {
        warn!("responseFormat is json_schema but no jsonSchema was given, ignoring");
        return Ok(None);
    };

    let json_schema = serde_json::from_str(schema)
        .map_err(|e| AgentError::Config(format!("invalid jsonSchema in prompt file: {e}")))?;

    Ok(Some(ResponseFormat::JsonSchema { json_schema }))
}
