//! AgentFlow command-line entry point.

mod agents;
mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use agentflow_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use agentflow_runtime::AgentRuntime;
use agentflow_workflow::{Variables, WorkflowDefinition, WorkflowEngine, WorkflowEvent};
use agentflow_workqueue::TaskQueue;

use cli::{Cli, Commands, ConfigAction};

/// Install the global subscriber: console output plus an optional daily
/// rolling file. The returned guard flushes the file writer on drop.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = if logging.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let (file, guard) = match &logging.file_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(&logging.file_prefix)
                .max_log_files(30)
                .build(dir)
                .context("creating log file appender")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())
        .context("loading configuration")?;
    let _guard = init_tracing(&config.logging)?;

    match cli.command {
        Commands::Run { workflow, vars } => run_workflow(config, &workflow, vars).await,
        Commands::Validate { workflow } => validate_workflow(&workflow),
        Commands::Config {
            action: ConfigAction::Check,
        } => check_config(&config),
    }
}

/// Execute a workflow file against the dry-run agents and print the result.
async fn run_workflow(config: Config, path: &Path, vars: Vec<(String, serde_json::Value)>) -> Result<()> {
    let workflow = WorkflowDefinition::from_path(path)
        .with_context(|| format!("loading workflow {}", path.display()))?;

    let queue = Arc::new(TaskQueue::new(config.queue));
    let runtime = Arc::new(AgentRuntime::new(config.runtime));
    agents::register_dry_run_agents(&runtime).context("registering agents")?;
    let engine = Arc::new(WorkflowEngine::new(queue, runtime.clone(), config.workflow));

    engine.subscribe(|event| match event {
        WorkflowEvent::StepFailed { step_id, error, .. } => {
            warn!("Step {} failed: {}", step_id, error)
        }
        WorkflowEvent::StepSkipped { step_id, .. } => info!("Step {} skipped", step_id),
        _ => {}
    });

    let variables = (!vars.is_empty()).then(|| vars.into_iter().collect::<Variables>());
    let result = engine.execute_workflow(&workflow, variables).await?;

    engine.shutdown();
    runtime.shutdown();

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        anyhow::bail!(
            "workflow '{}' ended {:?}: {}",
            result.workflow_id,
            result.state,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn validate_workflow(path: &Path) -> Result<()> {
    let workflow = WorkflowDefinition::from_path(path)
        .with_context(|| format!("invalid workflow {}", path.display()))?;
    println!(
        "Workflow '{}' is valid ({} steps{})",
        workflow.id,
        workflow.steps.len(),
        if workflow.schedule.as_ref().is_some_and(|s| s.enabled) {
            ", scheduled"
        } else {
            ""
        }
    );
    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    let warnings = ConfigValidator::validate(config).into_result()?;
    for warning in &warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    println!("Configuration is valid");
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn demo(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
    }

    #[test]
    fn test_demo_config_is_valid() {
        let config = ConfigLoader::load(&demo("agentflow.toml")).unwrap();
        check_config(&config).unwrap();
        assert_eq!(config.queue.max_history, 100);
    }

    #[tokio::test]
    async fn test_demo_workflow_runs_against_dry_run_agents() {
        let workflow = WorkflowDefinition::from_path(demo("login.json")).unwrap();
        let config = Config::default();

        let queue = Arc::new(TaskQueue::new(config.queue));
        let runtime = Arc::new(AgentRuntime::new(config.runtime));
        agents::register_dry_run_agents(&runtime).unwrap();
        let engine = WorkflowEngine::new(queue.clone(), runtime, config.workflow);

        let mut vars = Variables::new();
        vars.insert("user".to_string(), serde_json::json!("bob"));
        let result = engine.execute_workflow(&workflow, Some(vars)).await.unwrap();

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.completed_steps, 4);
        assert_eq!(
            result.step_results["profile"]["payload"]["url"],
            serde_json::json!("https://example.com/u/bob")
        );
        assert_eq!(
            result.step_results["username"]["type"],
            serde_json::json!("dom.type")
        );
        assert_eq!(queue.completed().len(), 4);
    }

    #[test]
    fn test_validate_rejects_missing_file() {
        assert!(validate_workflow(&demo("nope.json")).is_err());
        validate_workflow(&demo("login.json")).unwrap();
    }
}
