//! Tool Gateway
//!
//! Bridges a remote tool catalog (an MCP server) and the model's
//! function-calling interface. The gateway seam is a trait so the loop can be
//! driven against any catalog; [`GatewayHandle`] holds the connected gateway
//! together with the tools it listed for this invocation.
//!
//! Execution never fails from the caller's point of view: bad arguments and
//! remote failures come back as a [`ToolResult`] whose content starts with
//! `"Error:"`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AgentError, Result};

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation token echoed back in the tool result
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Raw argument text, expected to be a JSON object
    pub arguments: String,
}

/// Result from tool execution, re-injected as a `tool` message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Call this result answers
    pub tool_call_id: String,

    /// Tool that was called
    pub name: String,

    /// Output text, or an `Error: ...` description
    pub content: String,
}

impl ToolResult {
    pub fn success(call: &ToolCall, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: output.into(),
        }
    }

    pub fn failure(call: &ToolCall, error: impl std::fmt::Display) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: format!("Error: {error}"),
        }
    }

    pub fn is_error(&self) -> bool {
        self.content.starts_with("Error:")
    }
}

/// A tool as listed by the gateway
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    #[serde(default)]
    pub description: Option<String>,

    /// JSON schema of the arguments
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

/// Model-facing tool declaration: `{type: "function", function: {...}}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

/// Function part of a [`FunctionSchema`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl FunctionSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: "function".into(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

impl From<&ToolDescriptor> for FunctionSchema {
    fn from(tool: &ToolDescriptor) -> Self {
        Self::new(
            tool.name.clone(),
            tool.description.clone().unwrap_or_default(),
            tool.parameters
                .clone()
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
        )
    }
}

/// Remote tool catalog and execution endpoint
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// List the tools the gateway exposes
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Call one tool with parsed JSON arguments, returning its output text
    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<String>;
}

/// A connected gateway and the catalog it listed
pub struct GatewayHandle {
    gateway: Box<dyn ToolGateway>,
    tools: Vec<ToolDescriptor>,
    schemas: Vec<FunctionSchema>,
}

impl std::fmt::Debug for GatewayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayHandle")
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl GatewayHandle {
    /// List the catalog once; it stays fixed for the rest of the invocation
    pub async fn open(gateway: Box<dyn ToolGateway>) -> Result<Self> {
        let tools = gateway.list_tools().await?;
        let schemas = tools.iter().map(FunctionSchema::from).collect();

        debug!(tools = tools.len(), "Tool catalog loaded");

        Ok(Self {
            gateway,
            tools,
            schemas,
        })
    }

    /// Listed tools
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Catalog in the model-facing function-calling format
    pub fn function_schemas(&self) -> &[FunctionSchema] {
        &self.schemas
    }

    /// Execute one call; failures are folded into the result content
    pub async fn execute_tool_call(&self, call: &ToolCall) -> ToolResult {
        debug!(tool = %call.name, id = %call.id, "Executing tool");

        match self.try_execute(call).await {
            Ok(output) => ToolResult::success(call, output),
            Err(e) => {
                warn!(tool = %call.name, id = %call.id, error = %e, "Tool call failed");
                ToolResult::failure(call, e)
            }
        }
    }

    /// Execute calls one at a time, preserving input order
    pub async fn execute_tool_calls(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.execute_tool_call(call).await);
        }
        results
    }

    async fn try_execute(&self, call: &ToolCall) -> Result<String> {
        let arguments = parse_arguments(&call.arguments).map_err(|e| {
            AgentError::ToolExecution(format!("invalid arguments for '{}': {e}", call.name))
        })?;
        self.gateway
            .call_tool(&call.name, arguments)
            .await
            .map_err(|e| match e {
                AgentError::Gateway(message) => AgentError::ToolExecution(message),
                other => other,
            })
    }
}

/// Parse raw argument text; an empty string means no arguments
fn parse_arguments(raw: &str) -> std::result::Result<serde_json::Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoGateway;

    #[async_trait]
    impl ToolGateway for EchoGateway {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
            Ok(vec![
                ToolDescriptor {
                    name: "echo".into(),
                    description: Some("Echo arguments".into()),
                    parameters: Some(json!({"type": "object"})),
                },
                ToolDescriptor {
                    name: "bare".into(),
                    description: None,
                    parameters: None,
                },
            ])
        }

        async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<String> {
            match name {
                "echo" => Ok(arguments.to_string()),
                "offline" => Err(AgentError::Gateway("tools/call: connection reset".into())),
                other => Err(AgentError::ToolExecution(format!("unknown tool {other}"))),
            }
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    #[test]
    fn test_function_schema_mapping() {
        let tool = ToolDescriptor {
            name: "search".into(),
            description: Some("Search issues".into()),
            parameters: Some(json!({"type": "object", "properties": {"q": {"type": "string"}}})),
        };
        let json = serde_json::to_value(FunctionSchema::from(&tool)).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "search");
        assert_eq!(json["function"]["description"], "Search issues");
        assert_eq!(json["function"]["parameters"]["properties"]["q"]["type"], "string");
    }

    #[test]
    fn test_function_schema_defaults_missing_fields() {
        let tool = ToolDescriptor {
            name: "bare".into(),
            description: None,
            parameters: None,
        };
        let schema = FunctionSchema::from(&tool);
        assert_eq!(schema.function.description, "");
        assert_eq!(schema.function.parameters, json!({}));
    }

    #[tokio::test]
    async fn test_open_lists_catalog() {
        let handle = GatewayHandle::open(Box::new(EchoGateway)).await.unwrap();
        assert_eq!(handle.tools().len(), 2);
        assert_eq!(handle.function_schemas()[1].function.name, "bare");
    }

    #[tokio::test]
    async fn test_execute_tool_calls_keeps_order_and_isolates_failures() {
        let handle = GatewayHandle::open(Box::new(EchoGateway)).await.unwrap();
        let calls = vec![
            call("c1", "echo", r#"{"q":"x"}"#),
            call("c2", "echo", "{not json"),
            call("c3", "missing", "{}"),
            call("c4", "echo", ""),
        ];

        let results = handle.execute_tool_calls(&calls).await;

        assert_eq!(results.len(), 4);
        let ids: Vec<_> = results.iter().map(|r| r.tool_call_id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2", "c3", "c4"]);

        assert_eq!(results[0].content, r#"{"q":"x"}"#);
        assert!(results[1].content.starts_with("Error:"));
        assert!(results[1].content.contains("invalid arguments"));
        assert!(results[2].content.starts_with("Error:"));
        assert_eq!(results[3].content, "{}");
        assert!(!results[3].is_error());
    }

    #[tokio::test]
    async fn test_failure_content_has_single_prefix() {
        let handle = GatewayHandle::open(Box::new(EchoGateway)).await.unwrap();

        let result = handle.execute_tool_call(&call("c1", "missing", "{}")).await;
        assert_eq!(result.content, "Error: unknown tool missing");

        let result = handle.execute_tool_call(&call("c2", "offline", "{}")).await;
        assert_eq!(result.content, "Error: tools/call: connection reset");

        let result = handle.execute_tool_call(&call("c3", "echo", "[")).await;
        assert!(result.content.starts_with("Error: invalid arguments for 'echo'"));
    }
}
