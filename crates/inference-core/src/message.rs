//! Conversation Messages
//!
//! Role-tagged message format threaded through the inference loop.
//! Assistant turns carry the tool calls they requested; tool turns carry the
//! id of the call they answer.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::tool::{ToolCall, ToolResult};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Create an assistant message without tool calls
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    /// Text content, if any
    pub fn content(&self) -> Option<&str> {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Tool { content, .. } => Some(content),
            Message::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// Tool calls requested by an assistant message
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

impl From<ToolResult> for Message {
    fn from(result: ToolResult) -> Self {
        Message::Tool {
            tool_call_id: result.tool_call_id,
            name: result.name,
            content: result.content,
        }
    }
}

/// Append-only message list owned by one invocation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Add a system or user message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Record an assistant turn. A missing content is stored as an empty string.
    pub fn push_assistant(&mut self, content: Option<String>, tool_calls: Vec<ToolCall>) {
        self.messages.push(Message::Assistant {
            content: Some(content.unwrap_or_default()),
            tool_calls,
        });
    }

    /// Append tool results answering the immediately preceding assistant turn.
    ///
    /// Every result must reference one of that turn's tool calls.
    pub fn push_tool_results(&mut self, results: Vec<ToolResult>) -> Result<()> {
        let pending: Vec<&str> = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role() != Role::Tool)
            .filter(|m| m.role() == Role::Assistant)
            .map(|m| m.tool_calls().iter().map(|c| c.id.as_str()).collect())
            .unwrap_or_default();

        if let Some(orphan) = results
            .iter()
            .find(|r| !pending.contains(&r.tool_call_id.as_str()))
        {
            return Err(AgentError::Conversation(format!(
                "tool result '{}' does not answer the preceding assistant turn",
                orphan.tool_call_id
            )));
        }

        self.messages.extend(results.into_iter().map(Message::from));
        Ok(())
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Content of the most recent assistant message, scanning from the end
    pub fn last_assistant_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::Assistant)
            .and_then(Message::content)
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "search".into(),
            arguments: "{}".into(),
        }
    }

    fn result(id: &str) -> ToolResult {
        ToolResult {
            tool_call_id: id.into(),
            name: "search".into(),
            content: "[]".into(),
        }
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.content(), Some("Hello"));
    }

    #[test]
    fn test_role_tagged_serialization() {
        let json = serde_json::to_value(Message::system("S")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "S"}));

        let json = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_push_assistant_defaults_content() {
        let mut conv = Conversation::new();
        conv.push_assistant(None, vec![call("c1")]);

        assert_eq!(conv.last().unwrap().content(), Some(""));
        assert_eq!(conv.last().unwrap().tool_calls().len(), 1);
    }

    #[test]
    fn test_tool_results_follow_their_assistant_turn() {
        let mut conv = Conversation::from_messages(vec![Message::user("q")]);
        conv.push_assistant(None, vec![call("c1"), call("c2")]);

        conv.push_tool_results(vec![result("c1")]).unwrap();
        conv.push_tool_results(vec![result("c2")]).unwrap();
        assert_eq!(conv.len(), 4);

        assert!(matches!(
            conv.push_tool_results(vec![result("c9")]),
            Err(AgentError::Conversation(_))
        ));
    }

    #[test]
    fn test_tool_results_without_assistant_turn_rejected() {
        let mut conv = Conversation::from_messages(vec![Message::user("q")]);
        assert!(conv.push_tool_results(vec![result("c1")]).is_err());
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_last_assistant_content() {
        let mut conv = Conversation::from_messages(vec![Message::system("S"), Message::user("U")]);
        assert_eq!(conv.last_assistant_content(), None);

        conv.push_assistant(Some("first".into()), vec![call("c1")]);
        conv.push_tool_results(vec![result("c1")]).unwrap();
        assert_eq!(conv.last_assistant_content(), Some("first"));
    }
}
