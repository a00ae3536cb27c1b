//! Workflow definitions.
//!
//! A workflow is an ordered list of steps. Steps are linked into a graph by
//! their `on_success` / `on_failure` edges; a missing edge means "the next
//! step in declaration order".

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use agentflow_core::Registerable;
use agentflow_protocols::{Payload, TaskPriority};

use crate::conditions::WorkflowCondition;
use crate::error::WorkflowError;

/// Named values available to `{{name}}` placeholders.
pub type Variables = serde_json::Map<String, Value>;

/// A registered, immutable workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<WorkflowStep>,
    /// Defaults, overridden by the variables passed to a run.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub variables: Variables,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<WorkflowSchedule>,
}

impl Registerable for WorkflowDefinition {
    fn registry_id(&self) -> &str {
        &self.id
    }
}

impl WorkflowDefinition {
    /// Parse a JSON definition and validate it.
    pub fn from_json(source: &str) -> Result<Self, WorkflowError> {
        let workflow: Self = serde_json::from_str(source)?;
        workflow.validate()?;
        Ok(workflow)
    }

    /// Parse a TOML definition and validate it.
    pub fn from_toml(source: &str) -> Result<Self, WorkflowError> {
        let workflow: Self = toml::from_str(source)?;
        workflow.validate()?;
        Ok(workflow)
    }

    /// Load a definition file. `.toml` files are read as TOML, everything
    /// else as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&source),
            _ => Self::from_json(&source),
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    /// Check that step ids are unique and non-empty and that every edge
    /// targets a step of this workflow.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.id.trim().is_empty() {
            return Err(WorkflowError::invalid(&self.id, "workflow id is empty"));
        }

        let mut ids = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(WorkflowError::invalid(&self.id, "step id is empty"));
            }
            if !ids.insert(step.id.as_str()) {
                return Err(WorkflowError::invalid(
                    &self.id,
                    format!("duplicate step id: {}", step.id),
                ));
            }
        }

        for step in &self.steps {
            for (label, edge) in [("on_success", &step.on_success), ("on_failure", &step.on_failure)] {
                if let Some(StepEdge::Step(target)) = edge {
                    if !ids.contains(target.as_str()) {
                        return Err(WorkflowError::invalid(
                            &self.id,
                            format!("step {} {} targets unknown step {}", step.id, label, target),
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Interval schedule. Cron expressions are accepted but not run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSchedule {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl WorkflowSchedule {
    pub fn every_ms(interval_ms: u64) -> Self {
        Self {
            enabled: true,
            interval_ms: Some(interval_ms),
            ..Default::default()
        }
    }
}

/// Where to go after a step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepEdge {
    /// Stop the run. Written as `"abort"`.
    Abort,
    Step(String),
}

impl From<String> for StepEdge {
    fn from(value: String) -> Self {
        if value == "abort" {
            StepEdge::Abort
        } else {
            StepEdge::Step(value)
        }
    }
}

impl From<&str> for StepEdge {
    fn from(value: &str) -> Self {
        StepEdge::from(value.to_string())
    }
}

impl From<StepEdge> for String {
    fn from(edge: StepEdge) -> Self {
        match edge {
            StepEdge::Abort => "abort".to_string(),
            StepEdge::Step(id) => id,
        }
    }
}

/// One node of the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    /// Preferred agent, used when no agent advertises the task type.
    #[serde(default)]
    pub agent_id: String,
    pub action: StepAction,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<WorkflowCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<StepEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<StepEdge>,
}

impl WorkflowStep {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        agent_id: impl Into<String>,
        action: impl Into<StepAction>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            agent_id: agent_id.into(),
            action: action.into(),
            conditions: Vec::new(),
            on_success: None,
            on_failure: None,
        }
    }

    pub fn with_condition(mut self, condition: WorkflowCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn on_success(mut self, edge: impl Into<StepEdge>) -> Self {
        self.on_success = Some(edge.into());
        self
    }

    pub fn on_failure(mut self, edge: impl Into<StepEdge>) -> Self {
        self.on_failure = Some(edge.into());
        self
    }
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// A page interaction, dispatched as a `dom.<type>` task.
    Dom(DomAction),
    /// An arbitrary task.
    Task(TaskTemplate),
}

impl StepAction {
    /// Capability id of the task this action becomes.
    pub fn task_type(&self) -> String {
        match self {
            StepAction::Dom(action) => format!("dom.{}", action.action_type.as_str()),
            StepAction::Task(template) => template.task_type.clone(),
        }
    }

    /// Task payload. DOM actions flatten their options next to `selector`
    /// and `value`.
    pub fn payload(&self) -> Payload {
        match self {
            StepAction::Dom(action) => {
                let mut payload = Payload::new();
                if let Some(selector) = &action.selector {
                    payload.insert("selector".to_string(), Value::String(selector.clone()));
                }
                if let Some(value) = &action.value {
                    payload.insert("value".to_string(), Value::String(value.clone()));
                }
                if let Ok(Value::Object(options)) = serde_json::to_value(&action.options) {
                    payload.extend(options);
                }
                payload
            }
            StepAction::Task(template) => template.payload.clone(),
        }
    }
}

impl From<DomAction> for StepAction {
    fn from(action: DomAction) -> Self {
        StepAction::Dom(action)
    }
}

impl From<TaskTemplate> for StepAction {
    fn from(template: TaskTemplate) -> Self {
        StepAction::Task(template)
    }
}

/// DOM interaction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomActionType {
    Click,
    Type,
    Select,
    Scroll,
    Hover,
    Focus,
    Blur,
    Wait,
    Screenshot,
    Extract,
}

impl DomActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            DomActionType::Click => "click",
            DomActionType::Type => "type",
            DomActionType::Select => "select",
            DomActionType::Scroll => "scroll",
            DomActionType::Hover => "hover",
            DomActionType::Focus => "focus",
            DomActionType::Blur => "blur",
            DomActionType::Wait => "wait",
            DomActionType::Screenshot => "screenshot",
            DomActionType::Extract => "extract",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomAction {
    #[serde(rename = "type")]
    pub action_type: DomActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub options: DomActionOptions,
}

impl DomAction {
    pub fn new(action_type: DomActionType) -> Self {
        Self {
            action_type,
            selector: None,
            value: None,
            options: DomActionOptions::default(),
        }
    }

    pub fn click(selector: impl Into<String>) -> Self {
        Self::new(DomActionType::Click).with_selector(selector)
    }

    pub fn type_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(DomActionType::Type)
            .with_selector(selector)
            .with_value(text)
    }

    pub fn extract(selector: impl Into<String>) -> Self {
        Self::new(DomActionType::Extract).with_selector(selector)
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_options(mut self, options: DomActionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Hints for the agent performing a DOM action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomActionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_into_view: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_first: Option<bool>,
    /// Agent-specific options passed through untouched.
    #[serde(flatten)]
    pub extra: Payload,
}

/// A task to dispatch as-is. The task name is the step name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl TaskTemplate {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            payload: Payload::new(),
            priority: None,
            timeout_ms: None,
            retries: None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
