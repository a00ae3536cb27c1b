//! Workflow engine.
//!
//! A run walks the step graph one step at a time. Each step becomes a task
//! that is recorded in the [`TaskQueue`] and executed through the
//! [`AgentRuntime`]. Run state lives in a `watch` channel so a paused run
//! sleeps until `resume` or `cancel` changes it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use agentflow_config::{UnhandledFailure, WorkflowConfig};
use agentflow_core::{BaseRegistry, EventBus, Subscription};
use agentflow_protocols::{ErrorCode, TaskSpec};
use agentflow_runtime::AgentRuntime;
use agentflow_workqueue::{QueueError, TaskQueue};

use crate::conditions::{evaluate_all, EnvironmentProbe, NullProbe};
use crate::context::{WorkflowContext, WorkflowResult, WorkflowState};
use crate::definition::{StepAction, StepEdge, Variables, WorkflowDefinition, WorkflowSchedule, WorkflowStep};
use crate::error::WorkflowError;
use crate::events::WorkflowEvent;
use crate::schedule::run_interval;
use crate::variables::Resolver;

/// Capability prefixes routed by agent id when no agent advertises the
/// exact task type.
const FALLBACK_PREFIXES: [&str; 3] = ["dom", "form", "navigation"];

struct RunHandle {
    state: watch::Sender<WorkflowState>,
    context: Mutex<WorkflowContext>,
}

impl RunHandle {
    fn state(&self) -> WorkflowState {
        *self.state.borrow()
    }

    fn transition(&self, from: WorkflowState, to: WorkflowState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    fn snapshot(&self) -> WorkflowContext {
        let mut context = self.context.lock().clone();
        context.state = self.state();
        context
    }
}

/// Removes the live run when `execute_workflow` returns, unless a newer run
/// took its place after a cancel.
struct RunGuard<'a> {
    runs: &'a DashMap<String, Arc<RunHandle>>,
    workflow_id: String,
    handle: Arc<RunHandle>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.runs
            .remove_if(&self.workflow_id, |_, live| Arc::ptr_eq(live, &self.handle));
    }
}

enum RunEnd {
    Finished,
    Failed(String),
    Cancelled,
}

/// Executes workflow definitions against an agent runtime.
pub struct WorkflowEngine {
    config: WorkflowConfig,
    queue: Arc<TaskQueue>,
    runtime: Arc<AgentRuntime>,
    probe: Arc<dyn EnvironmentProbe>,
    workflows: BaseRegistry<WorkflowDefinition>,
    runs: DashMap<String, Arc<RunHandle>>,
    schedules: DashMap<String, CancellationToken>,
    next_task_seq: AtomicU64,
    events: EventBus<WorkflowEvent>,
}

impl WorkflowEngine {
    /// Create an engine whose conditions see an empty environment.
    pub fn new(queue: Arc<TaskQueue>, runtime: Arc<AgentRuntime>, config: WorkflowConfig) -> Self {
        Self {
            config,
            queue,
            runtime,
            probe: Arc::new(NullProbe),
            workflows: BaseRegistry::new(),
            runs: DashMap::new(),
            schedules: DashMap::new(),
            next_task_seq: AtomicU64::new(0),
            events: EventBus::new("workflow-engine"),
        }
    }

    /// Evaluate step conditions against `probe`.
    pub fn with_probe(mut self, probe: Arc<dyn EnvironmentProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Subscribe to workflow events.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&WorkflowEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler)
    }

    /// Register a workflow, replacing one with the same id, and arm its
    /// interval schedule if enabled.
    pub fn register_workflow(self: &Arc<Self>, workflow: WorkflowDefinition) -> Result<(), WorkflowError> {
        workflow.validate()?;
        let workflow = Arc::new(workflow);

        if self.workflows.register_or_replace(workflow.clone())?.is_some() {
            warn!("Workflow {} already registered, replacing", workflow.id);
        } else {
            info!("Registered workflow: {} ({})", workflow.name, workflow.id);
        }

        self.cancel_schedule(&workflow.id);
        if let Some(schedule) = workflow.schedule.as_ref().filter(|s| s.enabled) {
            self.arm_schedule(&workflow, schedule);
        }
        Ok(())
    }

    /// Remove a workflow and stop its schedule. Live runs are unaffected.
    pub fn unregister_workflow(&self, workflow_id: &str) -> bool {
        self.cancel_schedule(workflow_id);
        let removed = self.workflows.unregister(workflow_id).is_ok();
        if removed {
            info!("Unregistered workflow: {}", workflow_id);
        }
        removed
    }

    /// Registered workflows in registration order.
    pub fn workflows(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.workflows.list()
    }

    pub fn workflow(&self, workflow_id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.get(workflow_id)
    }

    /// Whether an interval schedule is armed for the workflow.
    pub fn is_scheduled(&self, workflow_id: &str) -> bool {
        self.schedules.contains_key(workflow_id)
    }

    fn arm_schedule(self: &Arc<Self>, workflow: &Arc<WorkflowDefinition>, schedule: &WorkflowSchedule) {
        if !self.config.schedules_enabled {
            debug!("Schedules disabled, not arming workflow {}", workflow.id);
            return;
        }
        if schedule.cron.is_some() {
            warn!(
                "Workflow {} has a cron expression; cron is not supported, using interval only",
                workflow.id
            );
        }
        let Some(interval_ms) = schedule.interval_ms.filter(|ms| *ms > 0) else {
            warn!("Workflow {} schedule has no interval, not armed", workflow.id);
            return;
        };
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, schedule for workflow {} not armed", workflow.id);
            return;
        };

        let token = CancellationToken::new();
        if let Some(previous) = self.schedules.insert(workflow.id.clone(), token.clone()) {
            previous.cancel();
        }
        rt.spawn(run_interval(
            Arc::downgrade(self),
            workflow.clone(),
            Duration::from_millis(interval_ms),
            token,
        ));
        info!("Scheduled workflow {} every {} ms", workflow.id, interval_ms);
    }

    fn cancel_schedule(&self, workflow_id: &str) {
        if let Some((_, token)) = self.schedules.remove(workflow_id) {
            token.cancel();
            debug!("Cancelled schedule for workflow {}", workflow_id);
        }
    }

    /// Run a registered workflow.
    pub async fn execute(
        &self,
        workflow_id: &str,
        variables: Option<Variables>,
    ) -> Result<WorkflowResult, WorkflowError> {
        let workflow = self
            .workflows
            .get(workflow_id)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(workflow_id.to_string()))?;
        self.execute_workflow(&workflow, variables).await
    }

    /// Run a workflow to completion.
    ///
    /// Returns `Err` only for caller errors: an invalid definition or a run
    /// of the same workflow already in progress. Step failures, aborts, and
    /// cancellation are reported in the returned [`WorkflowResult`].
    pub async fn execute_workflow(
        &self,
        workflow: &WorkflowDefinition,
        variables: Option<Variables>,
    ) -> Result<WorkflowResult, WorkflowError> {
        workflow.validate()?;

        let mut merged = workflow.variables.clone();
        if let Some(overrides) = variables {
            merged.extend(overrides);
        }

        let handle = match self.runs.entry(workflow.id.clone()) {
            Entry::Occupied(_) => return Err(WorkflowError::AlreadyRunning(workflow.id.clone())),
            Entry::Vacant(e) => {
                let (state, _) = watch::channel(WorkflowState::Running);
                let handle = Arc::new(RunHandle {
                    state,
                    context: Mutex::new(WorkflowContext::new(&workflow.id, merged)),
                });
                e.insert(handle.clone());
                handle
            }
        };
        let _guard = RunGuard {
            runs: &self.runs,
            workflow_id: workflow.id.clone(),
            handle: handle.clone(),
        };

        let started = Instant::now();
        info!(workflow = %workflow.id, "Workflow started: {}", workflow.name);
        self.events.emit(&WorkflowEvent::WorkflowStarted {
            workflow_id: workflow.id.clone(),
            name: workflow.name.clone(),
        });

        let end = self.run_steps(workflow, &handle).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (state, error) = match end {
            RunEnd::Finished => (WorkflowState::Completed, None),
            RunEnd::Failed(message) => (WorkflowState::Failed, Some(message)),
            RunEnd::Cancelled => (WorkflowState::Cancelled, Some("Workflow cancelled".to_string())),
        };
        handle.state.send_replace(state);

        let context = {
            let mut context = handle.context.lock();
            context.state = state;
            context.error = error.clone();
            context.current_task_id = None;
            context.clone()
        };

        let result = WorkflowResult {
            workflow_id: workflow.id.clone(),
            success: state == WorkflowState::Completed,
            state,
            completed_steps: context.step_results.len(),
            total_steps: workflow.steps.len(),
            duration_ms,
            step_results: context.step_results,
            executed_steps: context.executed_steps,
            error: error.clone(),
        };

        match state {
            WorkflowState::Completed => {
                info!(
                    workflow = %workflow.id,
                    "Workflow completed: {}/{} steps in {} ms",
                    result.completed_steps, result.total_steps, duration_ms
                );
                self.events.emit(&WorkflowEvent::WorkflowCompleted(result.clone()));
            }
            WorkflowState::Failed => {
                let error = error.unwrap_or_default();
                error!(workflow = %workflow.id, "Workflow failed: {}", error);
                self.events.emit(&WorkflowEvent::WorkflowFailed {
                    workflow_id: workflow.id.clone(),
                    error,
                });
            }
            _ => info!(workflow = %workflow.id, "Workflow run stopped after cancellation"),
        }

        Ok(result)
    }

    async fn run_steps(&self, workflow: &WorkflowDefinition, handle: &RunHandle) -> RunEnd {
        let mut state_rx = handle.state.subscribe();
        let mut next = workflow.steps.first().map(|s| s.id.clone());

        while let Some(step_id) = next.take() {
            if wait_while_paused(&mut state_rx).await != WorkflowState::Running {
                return RunEnd::Cancelled;
            }

            let Some(index) = workflow.step_index(&step_id) else {
                return RunEnd::Failed(WorkflowError::StepNotFound(step_id).to_string());
            };
            let step = &workflow.steps[index];
            handle.context.lock().current_step_index = index;

            if !step.conditions.is_empty() && !evaluate_all(&step.conditions, self.probe.as_ref()).await {
                debug!(workflow = %workflow.id, "Conditions not met for step {}", step.id);
                self.events.emit(&WorkflowEvent::StepSkipped {
                    workflow_id: workflow.id.clone(),
                    step_id: step.id.clone(),
                });
                next = match &step.on_failure {
                    Some(StepEdge::Abort) => None,
                    Some(StepEdge::Step(target)) => Some(target.clone()),
                    None => following(workflow, index),
                };
                continue;
            }

            debug!(workflow = %workflow.id, "Starting step {}", step.id);
            self.events.emit(&WorkflowEvent::StepStarted {
                workflow_id: workflow.id.clone(),
                step_id: step.id.clone(),
            });

            let outcome = self.execute_step(workflow, step, handle).await;
            if handle.state() == WorkflowState::Cancelled {
                return RunEnd::Cancelled;
            }

            match outcome {
                Ok(data) => {
                    {
                        let mut context = handle.context.lock();
                        context.step_results.insert(step.id.clone(), data.clone());
                        context.executed_steps.push(step.id.clone());
                    }
                    info!(workflow = %workflow.id, "Step completed: {}", step.id);
                    self.events.emit(&WorkflowEvent::StepCompleted {
                        workflow_id: workflow.id.clone(),
                        step_id: step.id.clone(),
                        result: data,
                    });

                    next = match &step.on_success {
                        Some(StepEdge::Step(target)) => Some(target.clone()),
                        Some(StepEdge::Abort) => None,
                        None => following(workflow, index),
                    };
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(workflow = %workflow.id, "Step {} failed: {}", step.id, message);
                    self.events.emit(&WorkflowEvent::StepFailed {
                        workflow_id: workflow.id.clone(),
                        step_id: step.id.clone(),
                        error: message.clone(),
                    });

                    match &step.on_failure {
                        Some(StepEdge::Step(target)) => next = Some(target.clone()),
                        Some(StepEdge::Abort) => return RunEnd::Failed(message),
                        None => match self.config.on_unhandled_failure {
                            UnhandledFailure::Abort => return RunEnd::Failed(message),
                            UnhandledFailure::Continue => next = following(workflow, index),
                        },
                    }
                }
            }
        }

        if handle.state() == WorkflowState::Cancelled {
            RunEnd::Cancelled
        } else {
            RunEnd::Finished
        }
    }

    async fn execute_step(
        &self,
        workflow: &WorkflowDefinition,
        step: &WorkflowStep,
        handle: &RunHandle,
    ) -> Result<Value, WorkflowError> {
        let action = {
            let context = handle.context.lock();
            Resolver::new(&context.variables, &context.step_results).resolve_action(&step.action)
        };

        let seq = self.next_task_seq.fetch_add(1, Ordering::Relaxed);
        let mut spec = TaskSpec::new(action.task_type(), step.name.clone())
            .with_id(format!(
                "{}-{}-{}-{}",
                workflow.id,
                step.id,
                Utc::now().timestamp_millis(),
                seq
            ))
            .with_priority(self.config.step_priority)
            .with_timeout_ms(self.config.step_timeout_ms)
            .with_payload(action.payload());
        if let StepAction::Task(template) = &action {
            if let Some(priority) = template.priority {
                spec = spec.with_priority(priority);
            }
            if let Some(timeout_ms) = template.timeout_ms {
                spec = spec.with_timeout_ms(timeout_ms);
            }
            if let Some(retries) = template.retries {
                spec = spec.with_retries(retries);
            }
        }

        let task = self.queue.add(spec)?;

        let Some(agent_id) = self.resolve_agent(&task.task_type, step) else {
            let err = WorkflowError::NoAgent(task.task_type.clone());
            record(self.queue.fail(&task.id, &err.to_string()));
            return Err(err);
        };
        record(self.queue.assign_to_agent(&task.id, &agent_id));
        record(self.queue.start(&task.id));

        handle.context.lock().current_task_id = Some(task.id.clone());
        let outcome = self.runtime.execute_task(&agent_id, task.clone()).await;
        handle.context.lock().current_task_id = None;

        match outcome {
            Ok(result) if result.success => {
                record(self.queue.complete(&task.id));
                Ok(result.data.unwrap_or(Value::Null))
            }
            Ok(result) => {
                let message = result
                    .error_message()
                    .unwrap_or("Step execution failed")
                    .to_string();
                if result.error_code() == Some(ErrorCode::Cancelled) {
                    record(self.queue.cancel(&task.id));
                } else {
                    record(self.queue.fail(&task.id, &message));
                }
                Err(WorkflowError::StepFailed {
                    step_id: step.id.clone(),
                    message,
                })
            }
            Err(e) => {
                record(self.queue.fail(&task.id, &e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Pick the agent for a task type: an exact capability match first,
    /// then an agent whose id names the type's prefix, then the step's own
    /// agent if it is registered.
    fn resolve_agent(&self, task_type: &str, step: &WorkflowStep) -> Option<String> {
        let agents = self.runtime.all_agents();

        if let Some(agent) = agents.iter().find(|a| a.has_capability(task_type)) {
            return Some(agent.id().to_string());
        }

        let prefix = task_type.split('.').next().unwrap_or_default();
        if task_type.contains('.') && FALLBACK_PREFIXES.contains(&prefix) {
            if let Some(agent) = agents.iter().find(|a| a.id().contains(prefix)) {
                return Some(agent.id().to_string());
            }
        }

        if !step.agent_id.is_empty() && self.runtime.get_agent(&step.agent_id).is_some() {
            return Some(step.agent_id.clone());
        }
        None
    }

    /// Hold a running workflow before its next step.
    pub fn pause(&self, workflow_id: &str) -> bool {
        let Some(handle) = self.live_run(workflow_id) else {
            return false;
        };
        if !handle.transition(WorkflowState::Running, WorkflowState::Paused) {
            return false;
        }
        info!("Workflow paused: {}", workflow_id);
        self.events.emit(&WorkflowEvent::WorkflowPaused {
            workflow_id: workflow_id.to_string(),
        });
        true
    }

    pub fn resume(&self, workflow_id: &str) -> bool {
        let Some(handle) = self.live_run(workflow_id) else {
            return false;
        };
        if !handle.transition(WorkflowState::Paused, WorkflowState::Running) {
            return false;
        }
        info!("Workflow resumed: {}", workflow_id);
        self.events.emit(&WorkflowEvent::WorkflowResumed {
            workflow_id: workflow_id.to_string(),
        });
        true
    }

    /// Cancel a live run and the task it is waiting on.
    ///
    /// The run is removed at once, so the same workflow may be started
    /// again while the cancelled run winds down.
    pub fn cancel(&self, workflow_id: &str) -> bool {
        let Some((_, handle)) = self.runs.remove(workflow_id) else {
            return false;
        };
        handle.state.send_replace(WorkflowState::Cancelled);

        let task_id = handle.context.lock().current_task_id.clone();
        if let Some(task_id) = task_id.filter(|id| self.runtime.is_running(id)) {
            self.runtime.cancel_task(&task_id);
        }

        info!("Workflow cancelled: {}", workflow_id);
        self.events.emit(&WorkflowEvent::WorkflowCancelled {
            workflow_id: workflow_id.to_string(),
        });
        true
    }

    fn live_run(&self, workflow_id: &str) -> Option<Arc<RunHandle>> {
        self.runs.get(workflow_id).map(|run| run.value().clone())
    }

    /// State of the live run, if any.
    pub fn state(&self, workflow_id: &str) -> Option<WorkflowState> {
        self.live_run(workflow_id).map(|handle| handle.state())
    }

    /// Snapshot of the live run's context, if any.
    pub fn context(&self, workflow_id: &str) -> Option<WorkflowContext> {
        self.live_run(workflow_id).map(|handle| handle.snapshot())
    }

    pub fn is_running(&self, workflow_id: &str) -> bool {
        self.runs.contains_key(workflow_id)
    }

    /// Ids of workflows with a live run.
    pub fn running_workflows(&self) -> Vec<String> {
        self.runs.iter().map(|run| run.key().clone()).collect()
    }

    /// Cancel all runs and schedules, then drop registrations and
    /// subscribers.
    pub fn shutdown(&self) {
        info!("Shutting down WorkflowEngine");

        let live: Vec<String> = self.running_workflows();
        for workflow_id in live {
            self.cancel(&workflow_id);
        }

        let scheduled: Vec<String> = self.schedules.iter().map(|s| s.key().clone()).collect();
        for workflow_id in scheduled {
            self.cancel_schedule(&workflow_id);
        }

        self.workflows.clear();
        self.events.clear();
    }
}

impl Drop for WorkflowEngine {
    fn drop(&mut self) {
        for schedule in self.schedules.iter() {
            schedule.value().cancel();
        }
    }
}

async fn wait_while_paused(state: &mut watch::Receiver<WorkflowState>) -> WorkflowState {
    state
        .wait_for(|state| *state != WorkflowState::Paused)
        .await
        .map(|state| *state)
        .unwrap_or(WorkflowState::Cancelled)
}

/// Id of the step declared after `index`.
fn following(workflow: &WorkflowDefinition, index: usize) -> Option<String> {
    workflow.steps.get(index + 1).map(|s| s.id.clone())
}

/// Queue bookkeeping never fails a step.
fn record<T>(result: Result<T, QueueError>) {
    if let Err(e) = result {
        warn!("Task queue bookkeeping failed: {}", e);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
