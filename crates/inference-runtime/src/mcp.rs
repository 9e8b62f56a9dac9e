//! MCP Tool Gateway
//!
//! Client side of the Model Context Protocol over streamable HTTP: JSON-RPC
//! requests are POSTed to a single endpoint and answered either with a JSON
//! body or with a server-sent event stream carrying the response.
//!
//! Only what the tool loop needs is implemented: the `initialize` handshake,
//! `tools/list` and `tools/call`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use inference_core::{
    error::{AgentError, Result},
    tool::{GatewayHandle, ToolDescriptor, ToolGateway},
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// GitHub's hosted MCP server
pub const DEFAULT_MCP_URL: &str = "https://api.githubcopilot.com/mcp/";

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "mcp-session-id";

/// Upper bound on `tools/list` pages fetched per connection
const MAX_TOOL_PAGES: usize = 50;

/// MCP connection configuration
#[derive(Clone, Debug)]
pub struct McpConfig {
    /// Streamable HTTP endpoint
    pub url: String,

    /// Bearer token
    pub token: String,

    /// Ask the server to expose read-only tools only
    pub readonly: bool,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MCP_URL.into(),
            token: String::new(),
            readonly: true,
            timeout_secs: 60,
        }
    }
}

/// Connect to the gateway and list its tools.
///
/// Any failure is logged and yields `None`; the caller then answers without
/// tools.
pub async fn connect(config: McpConfig) -> Option<GatewayHandle> {
    info!(url = %config.url, "Connecting to MCP server");

    let client = match McpClient::connect(config).await {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "MCP connection failed, continuing without tools");
            return None;
        }
    };

    match GatewayHandle::open(Box::new(client)).await {
        Ok(handle) => {
            info!(tools = handle.tools().len(), "MCP server connected");
            Some(handle)
        }
        Err(e) => {
            warn!(error = %e, "Listing MCP tools failed, continuing without tools");
            None
        }
    }
}

/// Streamable-HTTP MCP client
pub struct McpClient {
    client: reqwest::Client,
    config: McpConfig,
    session_id: Option<String>,
    next_id: AtomicU64,
}

impl McpClient {
    /// Open a session: `initialize` followed by `notifications/initialized`
    pub async fn connect(config: McpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/event-stream"));
        if config.readonly {
            headers.insert("x-mcp-readonly", HeaderValue::from_static("true"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .user_agent(concat!("ai-inference/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::Gateway(format!("cannot build HTTP client: {e}")))?;

        let mut mcp = Self {
            client,
            config,
            session_id: None,
            next_id: AtomicU64::new(1),
        };

        let (result, session_id) = mcp
            .send(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "ai-inference",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;

        mcp.session_id = session_id;
        debug!(
            server = ?result.pointer("/serverInfo/name"),
            session = ?mcp.session_id,
            "MCP initialize response"
        );

        mcp.notify("notifications/initialized").await?;
        Ok(mcp)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.send(method, params).await.map(|(result, _)| result)
    }

    /// POST one JSON-RPC request; returns its result and any session id header
    async fn send(&self, method: &str, params: Value) -> Result<(Value, Option<String>)> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self.post(&body).await?;
        let status = response.status();
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::Gateway(format!("{method}: {e}")))?;

        if !status.is_success() {
            return Err(AgentError::Gateway(format!(
                "{method} returned {status}: {}",
                text.trim()
            )));
        }

        let message = if is_stream {
            parse_event_stream(&text, id).ok_or_else(|| {
                AgentError::Gateway(format!("{method}: no response in event stream"))
            })?
        } else {
            serde_json::from_str(&text)
                .map_err(|e| AgentError::Gateway(format!("{method}: malformed response: {e}")))?
        };

        into_result(method, message).map(|result| (result, session_id))
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let body = json!({"jsonrpc": "2.0", "method": method});
        let response = self.post(&body).await?;

        if !response.status().is_success() {
            return Err(AgentError::Gateway(format!(
                "{method} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.token)
            .json(body);

        if let Some(session_id) = &self.session_id {
            request = request
                .header(SESSION_HEADER, session_id)
                .header("mcp-protocol-version", PROTOCOL_VERSION);
        }

        request
            .send()
            .await
            .map_err(|e| AgentError::Gateway(e.to_string()))
    }
}

#[async_trait]
impl ToolGateway for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        for _ in 0..MAX_TOOL_PAGES {
            let params = match &cursor {
                Some(cursor) => json!({"cursor": cursor}),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;
            if result.is_null() {
                break;
            }

            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| AgentError::Gateway(format!("tools/list: {e}")))?;
            tools.extend(page.tools.into_iter().map(ToolDescriptor::from));

            match page.next_cursor.filter(|next| !next.is_empty()) {
                Some(next) if seen.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    warn!(cursor = %next, "tools/list cursor repeated, stopping pagination");
                    break;
                }
                None => break,
            }
        }

        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        let arguments = if arguments.is_null() { json!({}) } else { arguments };

        let result: CallToolResult = serde_json::from_value(
            self.request("tools/call", json!({"name": name, "arguments": arguments}))
                .await?,
        )
        .map_err(|e| AgentError::ToolExecution(format!("{name}: {e}")))?;

        if result.is_error {
            return Err(AgentError::ToolExecution(render_text(&result.content)));
        }

        Ok(serde_json::to_string(&result.content)?)
    }
}

/// Find the JSON-RPC response with the given id in an event-stream body
fn parse_event_stream(body: &str, id: u64) -> Option<Value> {
    let mut data = String::new();
    let mut found = None;

    let mut flush = |data: &mut String| {
        if found.is_none() && !data.is_empty() {
            if let Ok(message) = serde_json::from_str::<Value>(data) {
                if message.get("id").and_then(Value::as_u64) == Some(id) {
                    found = Some(message);
                }
            }
        }
        data.clear();
    };

    for line in body.lines() {
        if line.is_empty() {
            flush(&mut data);
        } else if let Some(chunk) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(chunk.strip_prefix(' ').unwrap_or(chunk));
        }
    }
    flush(&mut data);

    found
}

/// Unwrap a JSON-RPC response into its result
fn into_result(method: &str, message: Value) -> Result<Value> {
    if let Some(error) = message.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let text = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(AgentError::Gateway(format!("{method} failed ({code}): {text}")));
    }

    Ok(message.get("result").cloned().unwrap_or(Value::Null))
}

/// Text parts of a tool result, joined by newlines
fn render_text(content: &[Value]) -> String {
    let text: Vec<&str> = content
        .iter()
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        "tool reported an error".into()
    } else {
        text.join("\n")
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ListToolsResult {
    tools: Vec<McpTool>,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct McpTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_schema: Option<Value>,
}

impl From<McpTool> for ToolDescriptor {
    fn from(tool: McpTool) -> Self {
        Self {
            name: tool.name,
            description: tool.description,
            parameters: tool.input_schema,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CallToolResult {
    content: Vec<Value>,
    is_error: bool,
}
