//! # inference-runtime
//!
//! HTTP adapters for the `ai-inference` step.
//!
//! ## Adapters
//!
//! - **openai**: `InferenceClient` for OpenAI-compatible `/chat/completions`
//!   endpoints (GitHub Models by default)
//! - **mcp**: `ToolGateway` for MCP servers over streamable HTTP (GitHub's
//!   hosted MCP server by default)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use inference_runtime::{mcp, ChatCompletionsClient, McpConfig};
//!
//! let client = ChatCompletionsClient::new(endpoint, token)?;
//! let gateway = mcp::connect(McpConfig { token, ..Default::default() }).await;
//! let agent = AgentBuilder::new().client(Arc::new(client)).build()?;
//! let answer = agent.respond(&mut conversation, gateway.as_ref(), None).await?;
//! ```

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "mcp")]
pub mod mcp;

#[cfg(feature = "openai")]
pub use openai::{ChatCompletionsClient, ChatCompletionsConfig};

#[cfg(feature = "mcp")]
pub use mcp::{McpClient, McpConfig};

// Re-export core types for convenience
pub use inference_core::{
    Agent, AgentBuilder, AgentError, Conversation, GatewayHandle, InferenceClient, Message,
    Result, ToolGateway,
};
