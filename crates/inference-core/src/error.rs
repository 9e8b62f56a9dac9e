//! Error Types

use thiserror::Error;

/// Result type alias for inference operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Inference error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Inference endpoint error (transport or protocol level)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Inference endpoint answered with a non-success status
    #[error("Unexpected response from inference endpoint ({status}): {detail}")]
    UnexpectedResponse { status: u16, detail: String },

    /// Tool gateway connection or protocol error
    #[error("Tool gateway error: {0}")]
    Gateway(String),

    /// Tool execution failed; the message is shown to the model as is
    #[error("{0}")]
    ToolExecution(String),

    /// Conversation invariant violated (e.g. orphan tool result)
    #[error("Conversation error: {0}")]
    Conversation(String),

    /// Configuration error (prompt, schema, template variables)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),
}

impl AgentError {
    /// Whether the error stems from user-supplied configuration
    ///
    /// Configuration errors abort the invocation before any network call.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            AgentError::Config(_) | AgentError::Yaml(_) | AgentError::Io(_)
        )
    }
}
