use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

fn page() -> StaticProbe {
    StaticProbe::new()
        .with_url("https://shop.example.com/cart?items=2")
        .with_element("#checkout", true, "Proceed to checkout")
        .with_element("#hidden-banner", false, "Sale ends soon")
}

#[tokio::test]
async fn test_element_predicates() {
    let probe = page();

    assert!(evaluate(&WorkflowCondition::element_exists("#checkout"), &probe).await);
    assert!(evaluate(&WorkflowCondition::element_exists("#hidden-banner"), &probe).await);
    assert!(!evaluate(&WorkflowCondition::element_exists("#missing"), &probe).await);

    assert!(evaluate(&WorkflowCondition::element_visible("#checkout"), &probe).await);
    assert!(!evaluate(&WorkflowCondition::element_visible("#hidden-banner"), &probe).await);
    assert!(!evaluate(&WorkflowCondition::element_visible("#missing"), &probe).await);
}

#[tokio::test]
async fn test_text_contains() {
    let probe = page();

    assert!(evaluate(&WorkflowCondition::text_contains("#checkout", "checkout"), &probe).await);
    assert!(!evaluate(&WorkflowCondition::text_contains("#checkout", "Checkout!"), &probe).await);
    assert!(!evaluate(&WorkflowCondition::text_contains("#missing", "x"), &probe).await);
}

#[tokio::test]
async fn test_url_matches() {
    let probe = page();

    assert!(evaluate(&WorkflowCondition::url_matches(r"/cart\?items=\d+"), &probe).await);
    assert!(!evaluate(&WorkflowCondition::url_matches("^http://"), &probe).await);
    assert!(!evaluate(&WorkflowCondition::url_matches("(unclosed"), &probe).await);
    assert!(!evaluate(&WorkflowCondition::url_matches(".*"), &NullProbe).await);
}

#[tokio::test]
async fn test_missing_fields_evaluate_false() {
    let probe = page();

    for kind in [
        ConditionKind::ElementExists,
        ConditionKind::ElementVisible,
        ConditionKind::TextContains,
        ConditionKind::UrlMatches,
    ] {
        assert!(!evaluate(&WorkflowCondition::new(kind), &probe).await, "{:?}", kind);
    }
}

#[tokio::test]
async fn test_custom_defaults_to_true() {
    assert!(evaluate(&WorkflowCondition::custom("anything"), &NullProbe).await);
}

#[tokio::test]
async fn test_evaluate_all_and_negate() {
    let probe = page();

    assert!(evaluate_all(&[], &probe).await);
    assert!(
        evaluate_all(
            &[
                WorkflowCondition::element_visible("#checkout"),
                WorkflowCondition::element_exists("#login").negated(),
            ],
            &probe
        )
        .await
    );
    assert!(
        !evaluate_all(
            &[
                WorkflowCondition::element_visible("#checkout"),
                WorkflowCondition::element_exists("#checkout").negated(),
            ],
            &probe
        )
        .await
    );
}

struct CountingProbe {
    calls: AtomicUsize,
}

#[async_trait]
impl EnvironmentProbe for CountingProbe {
    async fn element_exists(&self, _selector: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        false
    }

    async fn element_visible(&self, _selector: &str) -> bool {
        false
    }

    async fn element_text(&self, _selector: &str) -> Option<String> {
        None
    }

    async fn current_url(&self) -> Option<String> {
        None
    }

    async fn custom(&self, condition: &WorkflowCondition) -> bool {
        condition.value.as_deref() == Some("pass")
    }
}

#[tokio::test]
async fn test_evaluate_all_short_circuits() {
    let probe = CountingProbe {
        calls: AtomicUsize::new(0),
    };
    let conditions = [
        WorkflowCondition::element_exists("#a"),
        WorkflowCondition::element_exists("#b"),
    ];

    assert!(!evaluate_all(&conditions, &probe).await);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_custom_probe_override() {
    let probe = CountingProbe {
        calls: AtomicUsize::new(0),
    };
    assert!(evaluate(&WorkflowCondition::custom("pass"), &probe).await);
    assert!(!evaluate(&WorkflowCondition::custom("fail"), &probe).await);
}

#[test]
fn test_condition_serialization() {
    let condition = WorkflowCondition::element_exists("#go").negated();
    let json = serde_json::to_value(&condition).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "type": "element_exists", "selector": "#go", "negate": true })
    );

    let parsed: WorkflowCondition =
        serde_json::from_str(r#"{"type":"url_matches","value":"example"}"#).unwrap();
    assert_eq!(parsed.kind, ConditionKind::UrlMatches);
    assert!(!parsed.negate);
}
