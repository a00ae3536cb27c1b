use super::*;
use parking_lot::Mutex;
use std::sync::Arc;

fn spec(name: &str, priority: TaskPriority) -> TaskSpec {
    TaskSpec::new("test.run", name).with_priority(priority)
}

fn names(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.name.as_str()).collect()
}

#[test]
fn test_add_assigns_defaults() {
    let queue = TaskQueue::default();
    let task = queue.add(TaskSpec::new("dom.click", "Click")).unwrap();

    assert!(task.id.starts_with("task-"));
    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(task.priority, TaskPriority::Medium);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.find_task(&task.id).unwrap().name, "Click");
}

#[test]
fn test_add_duplicate_id() {
    let queue = TaskQueue::default();
    queue.add(TaskSpec::new("a", "A").with_id("same")).unwrap();

    let result = queue.add(TaskSpec::new("b", "B").with_id("same"));
    assert!(matches!(result, Err(QueueError::DuplicateTask(id)) if id == "same"));
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_priority_partition_and_fifo() {
    let queue = TaskQueue::default();
    let order = [
        ("m1", TaskPriority::Medium),
        ("l1", TaskPriority::Low),
        ("c1", TaskPriority::Critical),
        ("h1", TaskPriority::High),
        ("m2", TaskPriority::Medium),
        ("c2", TaskPriority::Critical),
        ("l2", TaskPriority::Low),
        ("h2", TaskPriority::High),
    ];
    for (name, priority) in order {
        queue.add(spec(name, priority)).unwrap();
    }

    assert_eq!(
        names(&queue.queued()),
        vec!["c1", "c2", "h1", "h2", "m1", "m2", "l1", "l2"]
    );
    assert_eq!(queue.get_next().unwrap().name, "c1");
}

#[test]
fn test_get_next_respects_queue_pause() {
    let queue = TaskQueue::default();
    queue.add(spec("a", TaskPriority::Medium)).unwrap();

    queue.pause();
    assert!(queue.is_paused());
    assert!(queue.get_next().is_none());

    queue.resume();
    assert_eq!(queue.get_next().unwrap().name, "a");
}

#[test]
fn test_get_next_skips_non_queued() {
    let queue = TaskQueue::default();
    let first = queue.add(spec("first", TaskPriority::High)).unwrap();
    queue.add(spec("second", TaskPriority::High)).unwrap();

    queue.start(&first.id).unwrap();
    assert_eq!(queue.get_next().unwrap().name, "second");
}

#[test]
fn test_parent_gating() {
    let queue = TaskQueue::default();
    let parent = queue.add(spec("parent", TaskPriority::Low)).unwrap();
    let child = queue
        .add_child_task(&parent.id, TaskSpec::new("test.run", "child"))
        .unwrap();

    assert_eq!(child.parent_task_id.as_deref(), Some(parent.id.as_str()));
    assert_eq!(child.priority, TaskPriority::Low);
    assert_eq!(
        queue.find_task(&parent.id).unwrap().child_task_ids,
        vec![child.id.clone()]
    );

    queue.start(&parent.id).unwrap();
    assert!(queue.get_next().is_none());

    queue.complete(&parent.id).unwrap();
    assert_eq!(queue.get_next().unwrap().id, child.id);
}

#[test]
fn test_gated_child_blocks_later_tasks() {
    let queue = TaskQueue::default();
    let parent = queue.add(spec("parent", TaskPriority::High)).unwrap();
    queue.start(&parent.id).unwrap();
    let child = queue
        .add_child_task(&parent.id, TaskSpec::new("test.run", "child"))
        .unwrap();
    queue.add(spec("independent", TaskPriority::Low)).unwrap();

    assert!(queue.get_next().is_none());

    queue.complete(&parent.id).unwrap();
    assert_eq!(queue.get_next().unwrap().id, child.id);

    queue.start(&child.id).unwrap();
    assert_eq!(queue.get_next().unwrap().name, "independent");
}

#[test]
fn test_failed_parent_keeps_child_gated() {
    let queue = TaskQueue::default();
    let parent = queue.add(spec("parent", TaskPriority::Medium)).unwrap();
    queue
        .add_child_task(&parent.id, TaskSpec::new("test.run", "child"))
        .unwrap();

    queue.start(&parent.id).unwrap();
    queue.fail(&parent.id, "boom").unwrap();
    assert!(queue.get_next().is_none());
}

#[test]
fn test_add_child_task_missing_parent() {
    let queue = TaskQueue::default();
    let result = queue.add_child_task("nope", TaskSpec::new("test.run", "child"));
    assert!(matches!(result, Err(QueueError::ParentNotFound(_))));
    assert!(queue.is_empty());
}

#[test]
fn test_start_requires_queued() {
    let queue = TaskQueue::default();
    let task = queue.add(spec("a", TaskPriority::Medium)).unwrap();

    queue.pause_task(&task.id).unwrap();
    let result = queue.start(&task.id);
    assert!(matches!(
        result,
        Err(QueueError::InvalidTransition {
            status: TaskStatus::Paused,
            ..
        })
    ));

    assert!(matches!(
        queue.start("missing"),
        Err(QueueError::TaskNotFound(_))
    ));
}

#[test]
fn test_complete_and_fail_move_to_history() {
    let queue = TaskQueue::default();
    let a = queue.add(spec("a", TaskPriority::Medium)).unwrap();
    let b = queue.add(spec("b", TaskPriority::Medium)).unwrap();

    queue.start(&a.id).unwrap();
    let done = queue.complete(&a.id).unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert!(done.completed_at.is_some());

    let failed = queue.fail(&b.id, "element not found").unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);

    assert!(queue.is_empty());
    assert_eq!(names(&queue.completed()), vec!["a"]);
    assert_eq!(names(&queue.failed()), vec!["b"]);
    assert!(matches!(
        queue.complete(&a.id),
        Err(QueueError::TaskNotFound(_))
    ));
}

#[test]
fn test_history_cap_newest_first() {
    let queue = TaskQueue::default();
    for i in 0..150 {
        let task = queue.add(spec(&format!("c{}", i), TaskPriority::Medium)).unwrap();
        queue.complete(&task.id).unwrap();

        let task = queue.add(spec(&format!("f{}", i), TaskPriority::Medium)).unwrap();
        queue.fail(&task.id, "error").unwrap();
    }

    let completed = queue.completed();
    assert_eq!(completed.len(), 100);
    assert_eq!(completed[0].name, "c149");
    assert_eq!(completed[99].name, "c50");

    let failed = queue.failed();
    assert_eq!(failed.len(), 100);
    assert_eq!(failed[0].name, "f149");
}

#[test]
fn test_history_cap_is_configurable() {
    let queue = TaskQueue::new(QueueConfig { max_history: 3 });
    for i in 0..5 {
        let task = queue.add(spec(&format!("t{}", i), TaskPriority::Medium)).unwrap();
        queue.complete(&task.id).unwrap();
    }
    assert_eq!(names(&queue.completed()), vec!["t4", "t3", "t2"]);
}

#[test]
fn test_cancel_drops_task() {
    let queue = TaskQueue::default();
    let task = queue.add(spec("a", TaskPriority::Medium)).unwrap();

    let cancelled = queue.cancel(&task.id).unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert!(queue.find_task(&task.id).is_none());
    assert!(queue.completed().is_empty());
    assert!(queue.failed().is_empty());
}

#[test]
fn test_pause_and_resume_task_keep_position() {
    let queue = TaskQueue::default();
    let a = queue.add(spec("a", TaskPriority::Medium)).unwrap();
    queue.add(spec("b", TaskPriority::Medium)).unwrap();

    queue.pause_task(&a.id).unwrap();
    assert_eq!(names(&queue.paused()), vec!["a"]);
    assert_eq!(queue.get_next().unwrap().name, "b");

    queue.resume_task(&a.id).unwrap();
    assert_eq!(names(&queue.all()), vec!["a", "b"]);
    assert_eq!(queue.get_next().unwrap().name, "a");

    assert!(matches!(
        queue.resume_task(&a.id),
        Err(QueueError::InvalidTransition { .. })
    ));
}

#[test]
fn test_retry_failed_task() {
    let queue = TaskQueue::default();
    let original = queue
        .add(
            spec("flaky", TaskPriority::High)
                .with_timeout_ms(500)
                .with_retries(2),
        )
        .unwrap();
    queue.fail(&original.id, "timeout").unwrap();

    let retried = queue.retry(&original.id).unwrap();
    assert_ne!(retried.id, original.id);
    assert_eq!(retried.name, "flaky");
    assert_eq!(retried.priority, TaskPriority::High);
    assert_eq!(retried.timeout_ms, Some(500));
    assert_eq!(retried.retries, Some(2));
    assert_eq!(retried.status, TaskStatus::Queued);
    assert!(queue.failed().is_empty());

    assert!(matches!(
        queue.retry(&original.id),
        Err(QueueError::TaskNotFound(_))
    ));
}

#[test]
fn test_clear_cancels_only_queued() {
    let queue = TaskQueue::default();
    let running = queue.add(spec("running", TaskPriority::High)).unwrap();
    let paused = queue.add(spec("paused", TaskPriority::High)).unwrap();
    queue.add(spec("queued1", TaskPriority::Low)).unwrap();
    queue.add(spec("queued2", TaskPriority::Low)).unwrap();

    queue.start(&running.id).unwrap();
    queue.pause_task(&paused.id).unwrap();

    let cancelled = queue.clear();
    assert_eq!(names(&cancelled), vec!["queued1", "queued2"]);
    assert!(cancelled.iter().all(|t| t.status == TaskStatus::Cancelled));
    assert_eq!(names(&queue.all()), vec!["running", "paused"]);
}

#[test]
fn test_clear_history() {
    let queue = TaskQueue::default();
    let task = queue.add(spec("a", TaskPriority::Medium)).unwrap();
    queue.complete(&task.id).unwrap();

    queue.clear_history();
    assert!(queue.completed().is_empty());
    assert!(queue.find_task(&task.id).is_none());
}

#[test]
fn test_assign_to_agent_and_by_agent() {
    let queue = TaskQueue::default();
    let a = queue.add(spec("a", TaskPriority::Medium)).unwrap();
    queue.add(spec("b", TaskPriority::Medium)).unwrap();

    queue.assign_to_agent(&a.id, "dom-agent").unwrap();
    assert_eq!(names(&queue.by_agent("dom-agent")), vec!["a"]);
    assert!(queue.by_agent("form-agent").is_empty());
}

#[test]
fn test_stats() {
    let queue = TaskQueue::default();
    let a = queue.add(spec("a", TaskPriority::Critical)).unwrap();
    let b = queue.add(spec("b", TaskPriority::Low)).unwrap();
    let c = queue.add(spec("c", TaskPriority::Low)).unwrap();
    queue.add(spec("d", TaskPriority::Medium)).unwrap();

    queue.start(&a.id).unwrap();
    queue.pause_task(&b.id).unwrap();
    queue.complete(&c.id).unwrap();

    let stats = queue.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.running, 1);
    assert_eq!(stats.paused, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.by_priority[&TaskPriority::Critical], 1);
    assert_eq!(stats.by_priority[&TaskPriority::High], 0);
    assert_eq!(stats.by_priority[&TaskPriority::Low], 1);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["by_priority"]["critical"], 1);
}

#[test]
fn test_events_are_emitted_in_order() {
    let queue = TaskQueue::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = queue.subscribe(move |event| sink.lock().push(event.name()));

    let task = queue.add(spec("a", TaskPriority::Medium)).unwrap();
    queue.start(&task.id).unwrap();
    queue.fail(&task.id, "boom").unwrap();
    queue.retry(&task.id).unwrap();
    queue.clear();
    queue.pause();
    queue.resume();

    assert_eq!(
        *seen.lock(),
        vec![
            "task:added",
            "task:started",
            "task:failed",
            "task:added",
            "queue:cleared",
            "queue:paused",
            "queue:resumed"
        ]
    );

    assert!(subscription.unsubscribe());
    queue.add(spec("b", TaskPriority::Medium)).unwrap();
    assert_eq!(seen.lock().len(), 7);
}

#[test]
fn test_handler_may_query_queue() {
    let queue = Arc::new(TaskQueue::default());
    let observed = Arc::new(Mutex::new(None));

    let weak = Arc::downgrade(&queue);
    let sink = observed.clone();
    queue.subscribe(move |event| {
        if let (QueueEvent::TaskAdded(_), Some(queue)) = (event, weak.upgrade()) {
            *sink.lock() = Some(queue.len());
        }
    });

    queue.add(spec("a", TaskPriority::Medium)).unwrap();
    assert_eq!(*observed.lock(), Some(1));
}
