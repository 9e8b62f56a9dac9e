//! Action Inputs
//!
//! Every input can be given as a flag or through the `INPUT_*` variables the
//! Actions runner sets. Resolution validates the inputs, reads prompt files
//! and produces everything the invocation needs before any network call.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use inference_core::{
    build_messages, build_response_format,
    prompt::is_prompt_file,
    provider::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL},
    template::{
        merge_template_variables, parse_file_template_variables, parse_template_variables,
    },
    AgentError, GenerationOptions, Message, PromptConfig, ResponseFormat, Result,
};
use inference_runtime::{mcp::DEFAULT_MCP_URL, openai::DEFAULT_ENDPOINT, McpConfig};

use crate::output;

#[derive(Parser, Debug)]
#[command(name = "ai-inference")]
#[command(version, about = "Run a prompt against a hosted model, optionally with read-only MCP tools")]
pub struct Cli {
    /// Prompt text
    #[arg(long, env = "INPUT_PROMPT")]
    pub prompt: Option<String>,

    /// Prompt file; `.prompt.yml` files are structured prompt definitions
    #[arg(long, env = "INPUT_PROMPT-FILE")]
    pub prompt_file: Option<PathBuf>,

    /// Template variables as a YAML mapping
    #[arg(long, env = "INPUT_INPUT")]
    pub input: Option<String>,

    /// Template variables read from files, as a YAML mapping of name to path
    #[arg(long, env = "INPUT_FILE_INPUT")]
    pub file_input: Option<String>,

    /// System prompt text
    #[arg(long, env = "INPUT_SYSTEM-PROMPT")]
    pub system_prompt: Option<String>,

    /// File containing the system prompt
    #[arg(long, env = "INPUT_SYSTEM-PROMPT-FILE")]
    pub system_prompt_file: Option<PathBuf>,

    /// Model identifier
    #[arg(long, env = "INPUT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Inference endpoint base URL
    #[arg(long, env = "INPUT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Maximum tokens to generate
    #[arg(
        long,
        env = "INPUT_MAX-TOKENS",
        default_value_t = DEFAULT_MAX_TOKENS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_tokens: u32,

    /// Token for the inference endpoint (falls back to GITHUB_TOKEN)
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Let the model call read-only tools of the GitHub MCP server
    #[arg(
        long,
        env = "INPUT_ENABLE-GITHUB-MCP",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub enable_github_mcp: bool,

    /// Token for the MCP server (falls back to --token)
    #[arg(long, env = "INPUT_GITHUB-MCP-TOKEN", hide_env_values = true)]
    pub github_mcp_token: Option<String>,

    /// MCP server URL
    #[arg(long, env = "INPUT_MCP-URL", default_value = DEFAULT_MCP_URL)]
    pub mcp_url: String,

    /// Where to persist the response
    #[arg(long, env = "INPUT_RESPONSE-FILE")]
    pub response_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything one invocation needs, validated
#[derive(Debug)]
pub struct Settings {
    pub messages: Vec<Message>,
    pub response_format: Option<ResponseFormat>,
    pub generation: GenerationOptions,
    pub endpoint: String,
    pub token: String,
    /// Present when tool use is enabled
    pub mcp: Option<McpConfig>,
    pub response_file: PathBuf,
}

impl Cli {
    /// Resolve against the process environment
    pub fn resolve(self) -> Result<Settings> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve_with(self, env: impl Fn(&str) -> Option<String>) -> Result<Settings> {
        let prompt = non_empty(self.prompt);
        let prompt_file = self.prompt_file.filter(|p| !p.as_os_str().is_empty());

        match (&prompt, &prompt_file) {
            (Some(_), Some(_)) => {
                return Err(AgentError::Config(
                    "prompt and prompt-file cannot both be set".into(),
                ))
            }
            (None, None) => {
                return Err(AgentError::Config(
                    "neither prompt nor prompt-file was set".into(),
                ))
            }
            _ => {}
        }

        let system_prompt = match (non_empty(self.system_prompt), self.system_prompt_file) {
            (Some(_), Some(_)) => {
                return Err(AgentError::Config(
                    "system-prompt and system-prompt-file cannot both be set".into(),
                ))
            }
            (Some(text), None) => Some(text),
            (None, Some(path)) => Some(read_input_file(&path, "system-prompt-file")?),
            (None, None) => None,
        };

        let token = non_empty(self.token)
            .or_else(|| non_empty(env("GITHUB_TOKEN")))
            .ok_or_else(|| {
                AgentError::Config("token is not set (pass --token or set GITHUB_TOKEN)".into())
            })?;

        let vars = merge_template_variables(
            parse_template_variables(self.input.as_deref().unwrap_or_default())?,
            parse_file_template_variables(self.file_input.as_deref().unwrap_or_default())?,
        )?;

        let mut generation = GenerationOptions {
            model: self.model,
            max_tokens: self.max_tokens,
            ..Default::default()
        };

        let (prompt_config, prompt_text) = match (prompt, prompt_file) {
            (_, Some(path)) if is_prompt_file(&path) => {
                if !path.is_file() {
                    return Err(AgentError::Config(format!(
                        "prompt file not found: {}",
                        path.display()
                    )));
                }
                (Some(PromptConfig::load(&path, &vars)?), None)
            }
            (_, Some(path)) => (None, Some(read_input_file(&path, "prompt-file")?)),
            (text, None) => (None, text),
        };

        if let Some(config) = &prompt_config {
            config.apply_to(&mut generation);
        }

        let messages = build_messages(
            prompt_config.as_ref(),
            system_prompt.as_deref(),
            prompt_text.as_deref(),
        );
        let response_format = build_response_format(prompt_config.as_ref())?;

        let mcp = self.enable_github_mcp.then(|| McpConfig {
            url: self.mcp_url,
            token: non_empty(self.github_mcp_token).unwrap_or_else(|| token.clone()),
            ..Default::default()
        });

        Ok(Settings {
            messages,
            response_format,
            generation,
            endpoint: self.endpoint,
            token,
            mcp,
            response_file: self
                .response_file
                .unwrap_or_else(|| output::default_response_file(&env)),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn read_input_file(path: &Path, input: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| AgentError::Config(format!("{input} {}: {e}", path.display())))
}
