//! Tool-calling loop behaviour against a scripted inference client and an
//! in-memory tool gateway.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use inference_core::{
    build_messages, AgentBuilder, AgentError, CallMode, Completion, Conversation,
    GatewayHandle, GenerationOptions, InferenceClient, Message, ResponseFormat, Result, Role,
    ToolCall, ToolDescriptor, ToolGateway, MAX_ITERATIONS,
};

// ── Scripted client ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Recorded {
    messages: Vec<Message>,
    tools: usize,
    response_format: Option<ResponseFormat>,
}

#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<Completion>>>,
    repeat: Option<Completion>,
    calls: Mutex<Vec<Recorded>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<Completion>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    fn repeating(reply: Completion) -> Arc<Self> {
        Arc::new(Self {
            repeat: Some(reply),
            ..Default::default()
        })
    }

    fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn complete(
        &self,
        messages: &[Message],
        _options: &GenerationOptions,
        mode: CallMode<'_>,
    ) -> Result<Completion> {
        self.calls.lock().unwrap().push(Recorded {
            messages: messages.to_vec(),
            tools: mode.tools().len(),
            response_format: mode.response_format().cloned(),
        });

        if let Some(reply) = &self.repeat {
            return Ok(reply.clone());
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::Provider("script exhausted".into())))
    }
}

// ── In-memory gateway ────────────────────────────────────────────────

struct StaticGateway;

#[async_trait]
impl ToolGateway for StaticGateway {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(vec![
            ToolDescriptor {
                name: "search".into(),
                description: Some("Search the repository".into()),
                parameters: Some(json!({"type": "object", "properties": {"q": {"type": "string"}}})),
            },
            ToolDescriptor {
                name: "broken".into(),
                description: None,
                parameters: None,
            },
        ])
    }

    async fn call_tool(&self, name: &str, _arguments: serde_json::Value) -> Result<String> {
        match name {
            "search" => Ok("[]".into()),
            _ => Err(AgentError::ToolExecution("tool exploded".into())),
        }
    }
}

async fn gateway() -> GatewayHandle {
    GatewayHandle::open(Box::new(StaticGateway)).await.unwrap()
}

fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments: arguments.into(),
    }
}

fn schema() -> ResponseFormat {
    ResponseFormat::JsonSchema {
        json_schema: json!({"name": "answer", "schema": {"type": "object"}}),
    }
}

fn conversation(prompt: &str) -> Conversation {
    Conversation::from_messages(build_messages(None, None, Some(prompt)))
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn answer_without_tools_takes_one_call() {
    let client = ScriptedClient::new(vec![Ok(Completion::text("Hi there"))]);
    let agent = AgentBuilder::new().client(client.clone()).build().unwrap();
    let gateway = gateway().await;
    let mut conv = conversation("Hello!");

    let content = agent.run(&mut conv, &gateway, None).await.unwrap();

    assert_eq!(content.as_deref(), Some("Hi there"));
    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tools, 2);
    assert!(calls[0].response_format.is_none());
}

#[tokio::test]
async fn tool_result_is_fed_back_before_second_call() {
    let client = ScriptedClient::new(vec![
        Ok(Completion::with_tool_calls(vec![call("c1", "search", r#"{"q":"x"}"#)])),
        Ok(Completion::text("nothing found")),
    ]);
    let agent = AgentBuilder::new().client(client.clone()).build().unwrap();
    let gateway = gateway().await;
    let mut conv = conversation("find x");

    let content = agent.run(&mut conv, &gateway, None).await.unwrap();

    assert_eq!(content.as_deref(), Some("nothing found"));

    let calls = client.calls();
    assert_eq!(calls.len(), 2);

    let second = &calls[1].messages;
    assert_eq!(second.len(), 4);
    let roles: Vec<Role> = second.iter().map(Message::role).collect();
    assert_eq!(roles, [Role::System, Role::User, Role::Assistant, Role::Tool]);
    assert_eq!(
        second[3],
        Message::Tool {
            tool_call_id: "c1".into(),
            name: "search".into(),
            content: "[]".into(),
        }
    );
}

#[tokio::test]
async fn failing_tool_does_not_stop_the_loop() {
    let client = ScriptedClient::new(vec![
        Ok(Completion::with_tool_calls(vec![
            call("c1", "broken", "{}"),
            call("c2", "search", "{}"),
        ])),
        Ok(Completion::text("done")),
    ]);
    let agent = AgentBuilder::new().client(client.clone()).build().unwrap();
    let gateway = gateway().await;
    let mut conv = conversation("go");

    let content = agent.run(&mut conv, &gateway, None).await.unwrap();
    assert_eq!(content.as_deref(), Some("done"));

    let second = &client.calls()[1].messages;
    assert!(second[3].content().unwrap().starts_with("Error:"));
    assert_eq!(second[4].content(), Some("[]"));
}

#[tokio::test]
async fn structured_output_forces_one_final_round() {
    let client = ScriptedClient::new(vec![
        Ok(Completion::text("The answer is 42")),
        Ok(Completion::text(r#"{"answer": 42}"#)),
    ]);
    let agent = AgentBuilder::new().client(client.clone()).build().unwrap();
    let gateway = gateway().await;
    let format = schema();
    let mut conv = conversation("question");

    let content = agent.run(&mut conv, &gateway, Some(&format)).await.unwrap();

    assert_eq!(content.as_deref(), Some(r#"{"answer": 42}"#));

    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].tools, 2);
    assert!(calls[0].response_format.is_none());
    assert_eq!(calls[1].tools, 0);
    assert_eq!(calls[1].response_format.as_ref(), Some(&format));

    let reformat = calls[1].messages.last().unwrap();
    assert_eq!(reformat.role(), Role::User);
    assert!(reformat.content().unwrap().contains("json_schema"));
}

#[tokio::test]
async fn tool_calls_in_final_round_keep_the_format_mode() {
    let client = ScriptedClient::new(vec![
        Ok(Completion::text("draft")),
        Ok(Completion::with_tool_calls(vec![call("c1", "search", "{}")])),
        Ok(Completion::text("{}")),
    ]);
    let agent = AgentBuilder::new().client(client.clone()).build().unwrap();
    let gateway = gateway().await;
    let format = schema();
    let mut conv = conversation("question");

    let content = agent.run(&mut conv, &gateway, Some(&format)).await.unwrap();

    assert_eq!(content.as_deref(), Some("{}"));
    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].tools, 0);
    assert!(calls[2].response_format.is_some());
}

#[tokio::test]
async fn budget_exhaustion_returns_last_assistant_content() {
    let client = ScriptedClient::repeating(Completion {
        content: Some("still looking".into()),
        ..Completion::with_tool_calls(vec![call("c1", "search", "{}")])
    });
    let agent = AgentBuilder::new().client(client.clone()).build().unwrap();
    let gateway = gateway().await;
    let mut conv = conversation("loop forever");

    let content = agent.run(&mut conv, &gateway, None).await.unwrap();

    assert_eq!(content.as_deref(), Some("still looking"));
    assert_eq!(client.calls().len(), MAX_ITERATIONS);
}

#[tokio::test]
async fn budget_exhaustion_without_assistant_turn_yields_nothing() {
    let client = ScriptedClient::new(Vec::new());
    let agent = AgentBuilder::new()
        .client(client.clone())
        .max_iterations(0)
        .build()
        .unwrap();
    let gateway = gateway().await;
    let mut conv = conversation("never asked");

    let content = agent.run(&mut conv, &gateway, None).await.unwrap();

    assert_eq!(content, None);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn transport_failure_aborts_the_loop() {
    let client = ScriptedClient::new(vec![Err(AgentError::UnexpectedResponse {
        status: 500,
        detail: "upstream down".into(),
    })]);
    let agent = AgentBuilder::new().client(client).build().unwrap();
    let gateway = gateway().await;
    let mut conv = conversation("hi");

    let err = agent.run(&mut conv, &gateway, None).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn missing_gateway_falls_back_to_single_call() {
    let client = ScriptedClient::new(vec![Ok(Completion::text("plain answer"))]);
    let agent = AgentBuilder::new().client(client.clone()).build().unwrap();
    let format = schema();
    let mut conv = conversation("Hello!");

    let content = agent.respond(&mut conv, None, Some(&format)).await.unwrap();

    assert_eq!(content.as_deref(), Some("plain answer"));
    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tools, 0);
    assert_eq!(calls[0].response_format.as_ref(), Some(&format));
    assert_eq!(
        calls[0].messages,
        vec![Message::system("You are a helpful assistant"), Message::user("Hello!")]
    );
}
