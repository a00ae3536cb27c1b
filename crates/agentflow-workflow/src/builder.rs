//! Fluent construction of workflow definitions.

use serde_json::Value;

use crate::definition::{Variables, WorkflowDefinition, WorkflowSchedule, WorkflowStep};
use crate::error::WorkflowError;

/// Builder for [`WorkflowDefinition`].
///
/// ```
/// use agentflow_workflow::{DomAction, WorkflowBuilder, WorkflowStep};
///
/// let workflow = WorkflowBuilder::new("login", "Login")
///     .variable("user", "ada")
///     .step(WorkflowStep::new("s1", "Type user", "dom-agent", DomAction::type_text("#user", "{{user}}")))
///     .step(WorkflowStep::new("s2", "Submit", "dom-agent", DomAction::click("#submit")))
///     .build()
///     .unwrap();
/// assert_eq!(workflow.steps.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    workflow: WorkflowDefinition,
}

impl WorkflowBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            workflow: WorkflowDefinition {
                id: id.into(),
                name: name.into(),
                description: None,
                steps: Vec::new(),
                variables: Variables::new(),
                schedule: None,
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.workflow.description = Some(description.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.workflow.variables.insert(name.into(), value.into());
        self
    }

    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.workflow.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = WorkflowStep>) -> Self {
        self.workflow.steps.extend(steps);
        self
    }

    pub fn schedule(mut self, schedule: WorkflowSchedule) -> Self {
        self.workflow.schedule = Some(schedule);
        self
    }

    /// Run every `interval_ms` once registered.
    pub fn every_ms(self, interval_ms: u64) -> Self {
        self.schedule(WorkflowSchedule::every_ms(interval_ms))
    }

    /// Validate and return the definition.
    pub fn build(self) -> Result<WorkflowDefinition, WorkflowError> {
        self.workflow.validate()?;
        Ok(self.workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{StepEdge, TaskTemplate};

    #[test]
    fn test_build() {
        let workflow = WorkflowBuilder::new("wf", "Workflow")
            .description("demo")
            .variable("n", 3)
            .steps([
                WorkflowStep::new("a", "A", "", TaskTemplate::new("x.run")).on_failure("c"),
                WorkflowStep::new("b", "B", "", TaskTemplate::new("x.run")),
                WorkflowStep::new("c", "C", "", TaskTemplate::new("x.run")).on_success(StepEdge::Abort),
            ])
            .every_ms(5_000)
            .build()
            .unwrap();

        assert_eq!(workflow.description.as_deref(), Some("demo"));
        assert_eq!(workflow.variables["n"], Value::from(3));
        assert_eq!(workflow.steps[0].on_failure, Some(StepEdge::Step("c".to_string())));
        assert_eq!(workflow.steps[2].on_success, Some(StepEdge::Abort));
        assert_eq!(workflow.schedule.unwrap().interval_ms, Some(5_000));
    }

    #[test]
    fn test_build_validates() {
        let result = WorkflowBuilder::new("wf", "Workflow")
            .step(WorkflowStep::new("a", "A", "", TaskTemplate::new("x.run")).on_success("zzz"))
            .build();
        assert!(matches!(result, Err(WorkflowError::InvalidWorkflow { .. })));
    }
}
