//! CLI entry point for turnkit.

pub mod ask;
pub mod chat;
pub mod render;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::models::{ReasoningEffort, ReasoningOverride, ReasoningSummary};

/// Turnkit terminal front-end
#[derive(Parser, Debug)]
#[command(name = "turnkit", version, about = "Streaming agent turns in the terminal")]
pub struct Cli {
    /// Log lifecycle detail to stderr (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hold a multi-turn conversation through the orchestrator
    Chat(ChatArgs),
    /// Run a single prompt straight through the engine
    Ask(AskArgs),
    /// List the supported models as JSON
    Models,
}

/// Options shared by every command that talks to a model.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Model id (unknown ids fall back to the configured default)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Reasoning effort (none, minimal, low, medium, high, xhigh)
    #[arg(long)]
    pub effort: Option<ReasoningEffort>,

    /// Reasoning summary (auto, concise, detailed)
    #[arg(long)]
    pub summary: Option<ReasoningSummary>,

    /// Path to a turnkit.toml to load instead of the default location
    #[arg(short, long, env = "TURNKIT_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ModelArgs {
    pub fn reasoning(&self) -> Option<ReasoningOverride> {
        ReasoningOverride {
            effort: self.effort,
            summary: self.summary,
        }
        .non_empty()
    }

    pub fn load_config(&self) -> Result<RuntimeConfig> {
        load_config(self.config.as_deref())
    }
}

/// How the `chat` command writes session events.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable deltas and tool markers
    #[default]
    Text,
    /// Raw `text/event-stream` frames on stdout
    Sse,
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub opts: ModelArgs,

    /// Session to submit turns to
    #[arg(short = 'S', long, default_value = "terminal")]
    pub session: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Submit this prompt, wait for the turn to finish, then exit
    pub prompt: Option<String>,
}

/// Arguments for the `ask` subcommand.
#[derive(Parser, Debug)]
pub struct AskArgs {
    #[command(flatten)]
    pub opts: ModelArgs,

    /// User prompt (positional)
    pub prompt: String,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "turnkit=info"
        } else {
            "turnkit=warn"
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load_from(path),
        None => RuntimeConfig::load(),
    }
}
