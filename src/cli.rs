//! CLI definitions for AgentFlow.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

/// AgentFlow CLI.
#[derive(Parser)]
#[command(name = "agentflow")]
#[command(about = "In-process task orchestration for agent-driven automation")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to the user config directory)
    #[arg(short, long, global = true, env = "AGENTFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Execute a workflow file against dry-run agents
    Run {
        /// Workflow definition (.json or .toml)
        workflow: PathBuf,

        /// Override a workflow variable, e.g. --var user=alice
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, Value)>,
    },

    /// Check a workflow file without running it
    Validate {
        /// Workflow definition (.json or .toml)
        workflow: PathBuf,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Load and validate the configuration
    Check,
}

/// Parse `key=value`. The value is read as JSON when it parses, so
/// `--var retries=3` yields a number; anything else is kept as a string.
pub(crate) fn parse_var(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in `{}`", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
