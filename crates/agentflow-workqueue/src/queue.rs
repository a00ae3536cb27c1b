//! Priority task queue implementation.
//!
//! Live tasks are kept in a single list ordered by priority weight, FIFO
//! within a weight. Terminal tasks leave the list: completed and failed ones
//! go to capped newest-first history lists, cancelled ones are dropped.

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use agentflow_config::QueueConfig;
use agentflow_core::{EventBus, Subscription};
use agentflow_protocols::{Task, TaskPriority, TaskSpec, TaskStatus};

use crate::error::QueueError;
use crate::events::QueueEvent;

/// Point-in-time queue counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub queued: usize,
    pub running: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
    /// Live tasks per priority.
    pub by_priority: BTreeMap<TaskPriority, usize>,
}

#[derive(Default)]
struct QueueState {
    live: Vec<Task>,
    completed: VecDeque<Task>,
    failed: VecDeque<Task>,
    paused: bool,
}

impl QueueState {
    fn live_index(&self, task_id: &str) -> Option<usize> {
        self.live.iter().position(|t| t.id == task_id)
    }

    fn find(&self, task_id: &str) -> Option<&Task> {
        self.live
            .iter()
            .chain(self.completed.iter())
            .chain(self.failed.iter())
            .find(|t| t.id == task_id)
    }

    fn find_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.live
            .iter_mut()
            .chain(self.completed.iter_mut())
            .chain(self.failed.iter_mut())
            .find(|t| t.id == task_id)
    }

    /// Place `task` before the first live task of strictly lower weight.
    fn insert(&mut self, task: Task) {
        let weight = task.priority.weight();
        let index = self
            .live
            .iter()
            .position(|t| t.priority.weight() < weight)
            .unwrap_or(self.live.len());
        self.live.insert(index, task);
    }

    /// A child is dispatchable once its parent completed. A parent that is
    /// no longer known does not hold the child back.
    fn parent_ready(&self, task: &Task) -> bool {
        match &task.parent_task_id {
            Some(parent_id) => self
                .find(parent_id)
                .is_none_or(|parent| parent.status == TaskStatus::Completed),
            None => true,
        }
    }

    fn count(&self, status: TaskStatus) -> usize {
        self.live.iter().filter(|t| t.status == status).count()
    }

    fn with_status(&self, status: TaskStatus) -> Vec<Task> {
        self.live
            .iter()
            .filter(|t| t.status == status)
            .cloned()
            .collect()
    }
}

fn push_history(history: &mut VecDeque<Task>, task: Task, cap: usize) {
    history.push_front(task);
    history.truncate(cap);
}

/// Priority-ordered task queue.
pub struct TaskQueue {
    config: QueueConfig,
    state: RwLock<QueueState>,
    events: EventBus<QueueEvent>,
}

impl TaskQueue {
    /// Create a new task queue.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            state: RwLock::new(QueueState::default()),
            events: EventBus::new("task-queue"),
        }
    }

    /// Subscribe to queue events.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler)
    }

    /// Add a task, filling in defaults for unset fields.
    pub fn add(&self, spec: TaskSpec) -> Result<Task, QueueError> {
        let task = {
            let mut state = self.state.write();
            Self::insert_new(&mut state, spec)?
        };

        debug!(
            "Queued task {} ({}, priority: {})",
            task.id,
            task.task_type,
            task.priority.as_str()
        );
        self.events.emit(&QueueEvent::TaskAdded(task.clone()));
        Ok(task)
    }

    fn insert_new(state: &mut QueueState, spec: TaskSpec) -> Result<Task, QueueError> {
        let task = spec.into_task();
        if state.find(&task.id).is_some() {
            return Err(QueueError::DuplicateTask(task.id));
        }
        state.insert(task.clone());
        Ok(task)
    }

    /// Add a task that may not run before `parent_id` completes.
    ///
    /// The child inherits the parent's priority unless one is given.
    pub fn add_child_task(&self, parent_id: &str, mut spec: TaskSpec) -> Result<Task, QueueError> {
        let task = {
            let mut state = self.state.write();
            let parent_priority = state
                .find(parent_id)
                .map(|parent| parent.priority)
                .ok_or_else(|| QueueError::ParentNotFound(parent_id.to_string()))?;

            spec.parent_task_id = Some(parent_id.to_string());
            spec.priority = spec.priority.or(Some(parent_priority));
            let task = Self::insert_new(&mut state, spec)?;

            if let Some(parent) = state.find_mut(parent_id) {
                parent.child_task_ids.push(task.id.clone());
            }
            task
        };

        debug!("Queued child task {} of {}", task.id, parent_id);
        self.events.emit(&QueueEvent::TaskAdded(task.clone()));
        Ok(task)
    }

    /// The first queued task, or `None` while the queue is paused.
    ///
    /// A child whose parent has not completed holds the head of the queue:
    /// nothing behind it is handed out until the parent completes.
    pub fn get_next(&self) -> Option<Task> {
        let state = self.state.read();
        if state.paused {
            return None;
        }
        state
            .live
            .iter()
            .find(|t| t.status == TaskStatus::Queued)
            .filter(|t| state.parent_ready(t))
            .cloned()
    }

    /// Mark a queued task as running.
    pub fn start(&self, task_id: &str) -> Result<Task, QueueError> {
        let task = {
            let mut state = self.state.write();
            let index = state
                .live_index(task_id)
                .ok_or_else(|| QueueError::TaskNotFound(task_id.to_string()))?;
            let task = &mut state.live[index];
            if task.status != TaskStatus::Queued {
                return Err(QueueError::InvalidTransition {
                    task_id: task_id.to_string(),
                    action: "started",
                    status: task.status,
                });
            }
            task.status = TaskStatus::Running;
            task.started_at = Some(Utc::now());
            task.clone()
        };

        debug!("Started task {}", task.id);
        self.events.emit(&QueueEvent::TaskStarted(task.clone()));
        Ok(task)
    }

    /// Mark a live task as completed and move it to history.
    pub fn complete(&self, task_id: &str) -> Result<Task, QueueError> {
        let task = self.finish(task_id, TaskStatus::Completed)?;
        debug!("Completed task {}", task.id);
        self.events.emit(&QueueEvent::TaskCompleted(task.clone()));
        Ok(task)
    }

    /// Mark a live task as failed and move it to history.
    pub fn fail(&self, task_id: &str, error: &str) -> Result<Task, QueueError> {
        let task = self.finish(task_id, TaskStatus::Failed)?;
        info!("Task {} failed: {}", task.id, error);
        self.events.emit(&QueueEvent::TaskFailed {
            task: task.clone(),
            error: error.to_string(),
        });
        Ok(task)
    }

    /// Cancel a live task. Cancelled tasks are not kept in history.
    pub fn cancel(&self, task_id: &str) -> Result<Task, QueueError> {
        let task = self.finish(task_id, TaskStatus::Cancelled)?;
        debug!("Cancelled task {}", task.id);
        self.events.emit(&QueueEvent::TaskCancelled(task.clone()));
        Ok(task)
    }

    fn finish(&self, task_id: &str, status: TaskStatus) -> Result<Task, QueueError> {
        let mut state = self.state.write();
        let index = state
            .live_index(task_id)
            .ok_or_else(|| QueueError::TaskNotFound(task_id.to_string()))?;

        let mut task = state.live.remove(index);
        task.status = status;
        task.completed_at = Some(Utc::now());

        let cap = self.config.max_history;
        match status {
            TaskStatus::Completed => push_history(&mut state.completed, task.clone(), cap),
            TaskStatus::Failed => push_history(&mut state.failed, task.clone(), cap),
            _ => {}
        }
        Ok(task)
    }

    /// Hold a queued task back from dispatch, keeping its position.
    pub fn pause_task(&self, task_id: &str) -> Result<Task, QueueError> {
        self.toggle(task_id, TaskStatus::Queued, TaskStatus::Paused, "paused")
    }

    /// Make a paused task dispatchable again.
    pub fn resume_task(&self, task_id: &str) -> Result<Task, QueueError> {
        self.toggle(task_id, TaskStatus::Paused, TaskStatus::Queued, "resumed")
    }

    fn toggle(
        &self,
        task_id: &str,
        from: TaskStatus,
        to: TaskStatus,
        action: &'static str,
    ) -> Result<Task, QueueError> {
        let task = {
            let mut state = self.state.write();
            let index = state
                .live_index(task_id)
                .ok_or_else(|| QueueError::TaskNotFound(task_id.to_string()))?;
            let task = &mut state.live[index];
            if task.status != from {
                return Err(QueueError::InvalidTransition {
                    task_id: task_id.to_string(),
                    action,
                    status: task.status,
                });
            }
            task.status = to;
            task.clone()
        };

        self.events.emit(&QueueEvent::TaskUpdated(task.clone()));
        Ok(task)
    }

    /// Re-queue a failed task from history under a fresh id.
    pub fn retry(&self, task_id: &str) -> Result<Task, QueueError> {
        let task = {
            let mut state = self.state.write();
            let index = state
                .failed
                .iter()
                .position(|t| t.id == task_id)
                .ok_or_else(|| QueueError::TaskNotFound(task_id.to_string()))?;
            let failed = state.failed.remove(index).ok_or_else(|| {
                QueueError::TaskNotFound(task_id.to_string())
            })?;
            Self::insert_new(&mut state, TaskSpec::from_task(&failed))?
        };

        info!("Retrying failed task {} as {}", task_id, task.id);
        self.events.emit(&QueueEvent::TaskAdded(task.clone()));
        Ok(task)
    }

    /// Stop `get_next` from yielding work. Running tasks are unaffected.
    pub fn pause(&self) {
        self.state.write().paused = true;
        info!("Queue paused");
        self.events.emit(&QueueEvent::QueuePaused);
    }

    pub fn resume(&self) {
        self.state.write().paused = false;
        info!("Queue resumed");
        self.events.emit(&QueueEvent::QueueResumed);
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    /// Cancel and drop every queued task. Running and paused tasks stay.
    ///
    /// Returns the cancelled tasks.
    pub fn clear(&self) -> Vec<Task> {
        let cancelled = {
            let mut state = self.state.write();
            let (queued, kept): (Vec<Task>, Vec<Task>) = std::mem::take(&mut state.live)
                .into_iter()
                .partition(|t| t.status == TaskStatus::Queued);
            state.live = kept;

            let now = Utc::now();
            queued
                .into_iter()
                .map(|mut task| {
                    task.status = TaskStatus::Cancelled;
                    task.completed_at = Some(now);
                    task
                })
                .collect::<Vec<_>>()
        };

        info!("Queue cleared, {} task(s) cancelled", cancelled.len());
        self.events.emit(&QueueEvent::QueueCleared);
        cancelled
    }

    /// Drop the completed and failed history.
    pub fn clear_history(&self) {
        let mut state = self.state.write();
        state.completed.clear();
        state.failed.clear();
    }

    /// Look a task up in the live list or either history list.
    pub fn find_task(&self, task_id: &str) -> Option<Task> {
        self.state.read().find(task_id).cloned()
    }

    pub fn queued(&self) -> Vec<Task> {
        self.state.read().with_status(TaskStatus::Queued)
    }

    pub fn running(&self) -> Vec<Task> {
        self.state.read().with_status(TaskStatus::Running)
    }

    pub fn paused(&self) -> Vec<Task> {
        self.state.read().with_status(TaskStatus::Paused)
    }

    /// Completed history, newest first.
    pub fn completed(&self) -> Vec<Task> {
        self.state.read().completed.iter().cloned().collect()
    }

    /// Failed history, newest first.
    pub fn failed(&self) -> Vec<Task> {
        self.state.read().failed.iter().cloned().collect()
    }

    /// All live tasks in queue order.
    pub fn all(&self) -> Vec<Task> {
        self.state.read().live.clone()
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.state.read().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().live.is_empty()
    }

    pub fn queued_count(&self) -> usize {
        self.state.read().count(TaskStatus::Queued)
    }

    pub fn running_count(&self) -> usize {
        self.state.read().count(TaskStatus::Running)
    }

    /// Live tasks assigned to `agent_id`.
    pub fn by_agent(&self, agent_id: &str) -> Vec<Task> {
        self.state
            .read()
            .live
            .iter()
            .filter(|t| t.agent_id.as_deref() == Some(agent_id))
            .cloned()
            .collect()
    }

    /// Record which agent owns a live task.
    pub fn assign_to_agent(&self, task_id: &str, agent_id: &str) -> Result<Task, QueueError> {
        let task = {
            let mut state = self.state.write();
            let index = state
                .live_index(task_id)
                .ok_or_else(|| QueueError::TaskNotFound(task_id.to_string()))?;
            let task = &mut state.live[index];
            task.agent_id = Some(agent_id.to_string());
            task.clone()
        };

        self.events.emit(&QueueEvent::TaskUpdated(task.clone()));
        Ok(task)
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.read();
        let mut by_priority: BTreeMap<TaskPriority, usize> =
            TaskPriority::ALL.iter().map(|p| (*p, 0)).collect();
        for task in &state.live {
            *by_priority.entry(task.priority).or_default() += 1;
        }

        QueueStats {
            total: state.live.len(),
            queued: state.count(TaskStatus::Queued),
            running: state.count(TaskStatus::Running),
            paused: state.count(TaskStatus::Paused),
            completed: state.completed.len(),
            failed: state.failed.len(),
            by_priority,
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
