//! ai-inference
//!
//! Runs one prompt against a chat-completions endpoint. With MCP enabled the
//! model may call read-only GitHub tools before answering. The final answer
//! is printed, written to the response file and exported as step outputs.

mod config;
mod output;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inference_runtime::{
    mcp, AgentBuilder, ChatCompletionsClient, ChatCompletionsConfig, Conversation,
};

use crate::config::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing; stdout carries the response
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
                println!("{}", output::error_annotation(&format!("{e:#}")));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.resolve().context("invalid action inputs")?;

    let client = ChatCompletionsClient::from_config(ChatCompletionsConfig {
        endpoint: settings.endpoint.clone(),
        token: settings.token.clone(),
        ..Default::default()
    })?;

    let agent = AgentBuilder::new()
        .client(Arc::new(client))
        .generation(settings.generation)
        .build()?;

    tracing::info!(
        model = %agent.config().generation.model,
        endpoint = %settings.endpoint,
        "Running inference"
    );

    // Connection failures degrade to a plain completion
    let gateway = match settings.mcp {
        Some(config) => mcp::connect(config).await,
        None => None,
    };

    let mut conversation = Conversation::from_messages(settings.messages);
    let response = agent
        .respond(
            &mut conversation,
            gateway.as_ref(),
            settings.response_format.as_ref(),
        )
        .await
        .context("inference failed")?
        .unwrap_or_default();

    println!("{response}");

    output::write_response_file(&settings.response_file, &response).with_context(|| {
        format!(
            "failed to write response file {}",
            settings.response_file.display()
        )
    })?;

    if let Some(path) = std::env::var_os("GITHUB_OUTPUT").filter(|p| !p.is_empty()) {
        output::write_step_outputs(Path::new(&path), &response, &settings.response_file)
            .context("failed to write step outputs")?;
    }

    Ok(())
}
