//! Tool-Calling Inference Loop
//!
//! Alternates between asking the model for a completion and executing the
//! tool calls it requests, until the model answers without tools or the
//! iteration budget runs out.
//!
//! ```text
//!   RUNNING(iteration, final_round) ──complete──► tool calls? ──yes──► execute, append, loop
//!                                                     │
//!                                                     no
//!                                                     ▼
//!                         format requested && !final_round ──yes──► ask to reformat, final_round = true
//!                                                     │
//!                                                     no
//!                                                     ▼
//!                                               DONE(content)
//! ```
//!
//! Tools and the response format are never attached to the same call: tool
//! rounds carry the catalog, the final round carries only the format.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::provider::{CallMode, Completion, GenerationOptions, InferenceClient, ResponseFormat};
use crate::tool::GatewayHandle;

/// Iteration budget of the tool-calling loop
pub const MAX_ITERATIONS: usize = 5;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum inference calls per invocation
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            generation: GenerationOptions::default(),
        }
    }
}

/// Drives one invocation against an inference client
pub struct Agent {
    client: Arc<dyn InferenceClient>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(client: Arc<dyn InferenceClient>, config: AgentConfig) -> Self {
        Self { client, config }
    }

    /// Create with default configuration
    pub fn with_defaults(client: Arc<dyn InferenceClient>) -> Self {
        Self::new(client, AgentConfig::default())
    }

    /// Answer the conversation, using the tool loop when a gateway is connected
    /// and a single tool-free call otherwise.
    pub async fn respond(
        &self,
        conversation: &mut Conversation,
        gateway: Option<&GatewayHandle>,
        response_format: Option<&ResponseFormat>,
    ) -> Result<Option<String>> {
        match gateway {
            Some(gateway) => self.run(conversation, gateway, response_format).await,
            None => self.complete_once(conversation, response_format).await,
        }
    }

    /// Single completion without tools
    pub async fn complete_once(
        &self,
        conversation: &mut Conversation,
        response_format: Option<&ResponseFormat>,
    ) -> Result<Option<String>> {
        let completion = self
            .complete(conversation, CallMode::FinalFormat(response_format))
            .await?;

        conversation.push_assistant(completion.content.clone(), Vec::new());
        Ok(completion.content)
    }

    /// Run the bounded tool-calling loop
    pub async fn run(
        &self,
        conversation: &mut Conversation,
        gateway: &GatewayHandle,
        response_format: Option<&ResponseFormat>,
    ) -> Result<Option<String>> {
        let mut iteration = 0;
        let mut final_round = false;

        loop {
            iteration += 1;

            if iteration > self.config.max_iterations {
                warn!(
                    max_iterations = self.config.max_iterations,
                    "Iteration budget exceeded, returning last assistant content"
                );
                return Ok(conversation.last_assistant_content().map(str::to_owned));
            }

            let mode = if final_round {
                CallMode::FinalFormat(response_format)
            } else {
                CallMode::WithTools(gateway.function_schemas())
            };

            info!(iteration, final_round, "Requesting completion");

            let Completion {
                content,
                tool_calls,
                ..
            } = self.complete(conversation, mode).await?;

            conversation.push_assistant(content.clone(), tool_calls.clone());

            if tool_calls.is_empty() {
                match response_format {
                    Some(format) if !final_round => {
                        debug!(format = format.kind(), "Requesting structured final answer");
                        conversation.push(Message::user(format!(
                            "Please provide your response in the exact {} format specified.",
                            format.kind()
                        )));
                        final_round = true;
                        continue;
                    }
                    _ => return Ok(content),
                }
            }

            info!(count = tool_calls.len(), "Model requested tool calls");

            let results = gateway.execute_tool_calls(&tool_calls).await;
            conversation.push_tool_results(results)?;
        }
    }

    async fn complete(&self, conversation: &Conversation, mode: CallMode<'_>) -> Result<Completion> {
        let completion = self
            .client
            .complete(conversation.messages(), &self.config.generation, mode)
            .await?;

        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        Ok(completion)
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    client: Option<Arc<dyn InferenceClient>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            config: AgentConfig::default(),
        }
    }

    pub fn client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn generation(mut self, generation: GenerationOptions) -> Self {
        self.config.generation = generation;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.generation.max_tokens = max_tokens;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let client = self
            .client
            .ok_or_else(|| AgentError::Config("Inference client is required".into()))?;

        Ok(Agent::new(client, self.config))
    }
}
