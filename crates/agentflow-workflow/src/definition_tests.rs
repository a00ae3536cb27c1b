use super::*;
use serde_json::json;

fn checkout() -> WorkflowDefinition {
    WorkflowDefinition {
        id: "checkout".to_string(),
        name: "Checkout".to_string(),
        description: None,
        steps: vec![
            WorkflowStep::new("s1", "Open cart", "dom-agent", DomAction::click("#cart"))
                .on_failure("s3"),
            WorkflowStep::new("s2", "Pay", "dom-agent", DomAction::click("#pay")),
            WorkflowStep::new("s3", "Report", "nav", TaskTemplate::new("navigation.go")),
        ],
        variables: Variables::new(),
        schedule: None,
    }
}

#[test]
fn test_validate_accepts_well_formed_graph() {
    checkout().validate().unwrap();
}

#[test]
fn test_validate_rejects_duplicate_step_ids() {
    let mut workflow = checkout();
    workflow.steps[2].id = "s1".to_string();
    let err = workflow.validate().unwrap_err();
    assert!(err.to_string().contains("duplicate step id: s1"));
}

#[test]
fn test_validate_rejects_dangling_edge() {
    let mut workflow = checkout();
    workflow.steps[1].on_success = Some(StepEdge::Step("s9".to_string()));
    let err = workflow.validate().unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidWorkflow { .. }));
    assert!(err.to_string().contains("s9"));
}

#[test]
fn test_validate_rejects_empty_ids() {
    let mut workflow = checkout();
    workflow.steps[0].id = " ".to_string();
    assert!(workflow.validate().is_err());

    let mut workflow = checkout();
    workflow.id = String::new();
    assert!(workflow.validate().is_err());
}

#[test]
fn test_abort_edge_needs_no_target() {
    let mut workflow = checkout();
    workflow.steps[1].on_failure = Some(StepEdge::Abort);
    workflow.validate().unwrap();
}

#[test]
fn test_edge_serialization() {
    assert_eq!(serde_json::to_value(StepEdge::Abort).unwrap(), json!("abort"));
    assert_eq!(
        serde_json::from_value::<StepEdge>(json!("s2")).unwrap(),
        StepEdge::Step("s2".to_string())
    );
    assert_eq!(StepEdge::from("abort"), StepEdge::Abort);
}

#[test]
fn test_dom_action_task_shape() {
    let action = StepAction::Dom(
        DomAction::type_text("#email", "a@b.c").with_options(DomActionOptions {
            clear_first: Some(true),
            ..Default::default()
        }),
    );

    assert_eq!(action.task_type(), "dom.type");
    assert_eq!(
        Value::Object(action.payload()),
        json!({ "selector": "#email", "value": "a@b.c", "clear_first": true })
    );
}

#[test]
fn test_task_action_passes_payload_through() {
    let action = StepAction::Task(
        TaskTemplate::new("form.fill").with_param("fields", json!({ "name": "Ada" })),
    );
    assert_eq!(action.task_type(), "form.fill");
    assert_eq!(
        Value::Object(action.payload()),
        json!({ "fields": { "name": "Ada" } })
    );
}

#[test]
fn test_from_json() {
    let source = r##"{
        "id": "login",
        "name": "Login",
        "variables": { "user": "ada" },
        "steps": [
            {
                "id": "s1",
                "name": "Type user",
                "agent_id": "dom-agent",
                "action": { "dom": { "type": "type", "selector": "#user", "value": "{{user}}" } },
                "conditions": [{ "type": "element_visible", "selector": "#user" }],
                "on_failure": "abort"
            },
            {
                "id": "s2",
                "name": "Go home",
                "action": { "task": { "type": "navigation.go", "payload": { "url": "/" } } }
            }
        ],
        "schedule": { "enabled": true, "interval_ms": 60000 }
    }"##;

    let workflow = WorkflowDefinition::from_json(source).unwrap();
    assert_eq!(workflow.steps.len(), 2);
    assert_eq!(workflow.steps[0].on_failure, Some(StepEdge::Abort));
    assert_eq!(workflow.steps[0].conditions.len(), 1);
    assert_eq!(workflow.steps[1].agent_id, "");
    assert_eq!(workflow.variables["user"], json!("ada"));
    assert_eq!(workflow.schedule, Some(WorkflowSchedule::every_ms(60_000)));
}

#[test]
fn test_from_json_rejects_invalid_graph() {
    let source = r#"{
        "id": "bad",
        "name": "Bad",
        "steps": [
            { "id": "s1", "name": "a", "action": { "task": { "type": "x" } }, "on_success": "nope" }
        ]
    }"#;
    assert!(matches!(
        WorkflowDefinition::from_json(source),
        Err(WorkflowError::InvalidWorkflow { .. })
    ));
}

#[test]
fn test_from_path_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("search.toml");
    std::fs::write(
        &path,
        r##"
id = "search"
name = "Search"

[variables]
query = "rust"

[[steps]]
id = "s1"
name = "Type query"
agent_id = "dom-agent"
on_success = "s2"

[steps.action.dom]
type = "type"
selector = "#q"
value = "{{query}}"

[[steps]]
id = "s2"
name = "Submit"

[steps.action.task]
type = "form.submit"
timeout_ms = 5000

[steps.action.task.payload]
form = "#search"
"##,
    )
    .unwrap();

    let workflow = WorkflowDefinition::from_path(&path).unwrap();
    assert_eq!(workflow.id, "search");
    assert_eq!(workflow.steps[0].on_success, Some(StepEdge::Step("s2".to_string())));
    match &workflow.steps[1].action {
        StepAction::Task(template) => {
            assert_eq!(template.task_type, "form.submit");
            assert_eq!(template.timeout_ms, Some(5000));
            assert_eq!(template.payload["form"], json!("#search"));
        }
        other => panic!("unexpected action {:?}", other),
    }
}

#[test]
fn test_from_path_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = WorkflowDefinition::from_path(dir.path().join("missing.json"));
    assert!(matches!(result, Err(WorkflowError::Io(_))));
}

#[test]
fn test_step_lookup() {
    let workflow = checkout();
    assert_eq!(workflow.step_index("s3"), Some(2));
    assert_eq!(workflow.step("s2").map(|s| s.name.as_str()), Some("Pay"));
    assert!(workflow.step("s4").is_none());
}
