//! # inference-core
//!
//! Conversation model, request assembly and the bounded tool-calling loop
//! behind the `ai-inference` CI step.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Agent                              │
//! │  ┌─────────────┐  ┌─────────────────┐  ┌──────────────────┐  │
//! │  │  Tool-call  │  │  GatewayHandle  │  │ InferenceClient  │  │
//! │  │    Loop     │──│  (ToolGateway)  │──│    (Strategy)    │  │
//! │  └─────────────┘  └─────────────────┘  └──────────────────┘  │
//! │         ▲                                                    │
//! │  ┌──────┴──────┐                                             │
//! │  │ Conversation│◄── prompt::build_messages / templates       │
//! │  └─────────────┘                                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `InferenceClient` and `ToolGateway` traits keep the loop independent of
//! the HTTP adapters in `inference-runtime`.

pub mod error;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod reasoning;
pub mod template;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use prompt::{build_messages, build_response_format, PromptConfig, DEFAULT_SYSTEM_PROMPT};
pub use provider::{CallMode, Completion, GenerationOptions, InferenceClient, ResponseFormat};
pub use reasoning::{Agent, AgentBuilder, MAX_ITERATIONS};
pub use template::TemplateVariables;
pub use tool::{FunctionSchema, GatewayHandle, ToolCall, ToolDescriptor, ToolGateway, ToolResult};
