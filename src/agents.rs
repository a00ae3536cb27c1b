//! Dry-run agents used by `agentflow run`.
//!
//! They accept every task they advertise, log it, and echo the payload
//! back, so a workflow's routing and variable resolution can be checked
//! without driving a real environment.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use agentflow_core::{AgentHandler, AgentState, BaseAgent};
use agentflow_protocols::{
    AgentCapability, AgentError, AgentMetadata, LogLevel, Task, TaskContext,
};
use agentflow_runtime::{AgentRuntime, RuntimeError};

const DOM_ACTIONS: [&str; 10] = [
    "click", "type", "select", "scroll", "hover", "focus", "blur", "wait", "screenshot", "extract",
];

struct DryRun;

#[async_trait]
impl AgentHandler for DryRun {
    async fn on_execute(
        &self,
        task: &Task,
        _ctx: &TaskContext,
        state: &AgentState,
    ) -> Result<Option<Value>, AgentError> {
        info!(agent = %state.metadata().id, task = %task.id, "Dry run: {} ({})", task.name, task.task_type);
        state.log(
            LogLevel::Info,
            format!("Dry run: {}", task.task_type),
            Some(Value::Object(task.payload.clone())),
        );
        state.set_progress(100);
        Ok(Some(json!({
            "dryRun": true,
            "type": task.task_type,
            "payload": task.payload,
        })))
    }
}

fn dry_run_agent(id: &str, name: &str, prefix: &str, actions: &[&str]) -> Arc<BaseAgent<DryRun>> {
    let metadata = actions.iter().fold(
        AgentMetadata::new(id, name).with_description("Logs tasks instead of performing them"),
        |metadata, action| {
            let capability = format!("{}.{}", prefix, action);
            metadata.with_capability(AgentCapability::new(capability.clone(), capability, ""))
        },
    );
    Arc::new(BaseAgent::new(metadata, DryRun))
}

/// Register the dom, form, and navigation dry-run agents.
pub(crate) fn register_dry_run_agents(runtime: &AgentRuntime) -> Result<(), RuntimeError> {
    runtime.register_agent(dry_run_agent("dom-agent", "DOM Agent", "dom", &DOM_ACTIONS))?;
    runtime.register_agent(dry_run_agent(
        "form-agent",
        "Form Agent",
        "form",
        &["fill", "submit", "validate"],
    ))?;
    runtime.register_agent(dry_run_agent(
        "navigation-agent",
        "Navigation Agent",
        "navigation",
        &["go", "back", "forward", "reload"],
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_config::RuntimeConfig;
    use agentflow_protocols::TaskSpec;

    #[tokio::test]
    async fn test_dry_run_agents_echo_tasks() {
        let runtime = AgentRuntime::new(RuntimeConfig::default());
        register_dry_run_agents(&runtime).unwrap();

        let ids: Vec<String> = runtime.all_agents().iter().map(|a| a.id().to_string()).collect();
        assert_eq!(ids, vec!["dom-agent", "form-agent", "navigation-agent"]);
        assert!(runtime.get_agent("dom-agent").unwrap().has_capability("dom.extract"));

        let mut payload = agentflow_protocols::Payload::new();
        payload.insert("url".to_string(), json!("https://example.com"));
        let task = TaskSpec::new("navigation.go", "Open")
            .with_payload(payload)
            .into_task();

        let result = runtime.execute_task("navigation-agent", task).await.unwrap();
        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["dryRun"], json!(true));
        assert_eq!(data["payload"]["url"], json!("https://example.com"));
    }
}
