//! Step conditions and the environment they are evaluated against.
//!
//! Conditions are a closed set of predicates over live page state. The
//! engine never inspects the environment itself; it asks an
//! [`EnvironmentProbe`] supplied by the host application.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Predicate type of a [`WorkflowCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    ElementExists,
    ElementVisible,
    TextContains,
    UrlMatches,
    Custom,
}

/// A gate on a workflow step. All conditions of a step must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowCondition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Invert the predicate.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negate: bool,
}

impl WorkflowCondition {
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            selector: None,
            value: None,
            negate: false,
        }
    }

    pub fn element_exists(selector: impl Into<String>) -> Self {
        Self::new(ConditionKind::ElementExists).with_selector(selector)
    }

    pub fn element_visible(selector: impl Into<String>) -> Self {
        Self::new(ConditionKind::ElementVisible).with_selector(selector)
    }

    pub fn text_contains(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(ConditionKind::TextContains)
            .with_selector(selector)
            .with_value(text)
    }

    /// `pattern` is a regular expression tested against the current URL.
    pub fn url_matches(pattern: impl Into<String>) -> Self {
        Self::new(ConditionKind::UrlMatches).with_value(pattern)
    }

    pub fn custom(value: impl Into<String>) -> Self {
        Self::new(ConditionKind::Custom).with_value(value)
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

/// Read-only view of the environment a workflow automates.
#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    async fn element_exists(&self, selector: &str) -> bool;

    /// Whether the element exists and has a non-empty rendered box.
    async fn element_visible(&self, selector: &str) -> bool;

    /// Text content of the element, `None` if it does not exist.
    async fn element_text(&self, selector: &str) -> Option<String>;

    async fn current_url(&self) -> Option<String>;

    /// Evaluate a `custom` condition. Holds unless overridden.
    async fn custom(&self, _condition: &WorkflowCondition) -> bool {
        true
    }
}

/// An empty environment: no elements, no URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProbe;

#[async_trait]
impl EnvironmentProbe for NullProbe {
    async fn element_exists(&self, _selector: &str) -> bool {
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
}

#[derive(Debug, Clone, Default)]
struct StaticElement {
    visible: bool,
    text: String,
}

/// A fixed, in-memory environment.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    url: Option<String>,
    elements: HashMap<String, StaticElement>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_element(
        mut self,
        selector: impl Into<String>,
        visible: bool,
        text: impl Into<String>,
    ) -> Self {
        self.elements.insert(
            selector.into(),
            StaticElement {
                visible,
                text: text.into(),
            },
        );
        self
    }
}

#[async_trait]
impl EnvironmentProbe for StaticProbe {
    async fn element_exists(&self, selector: &str) -> bool {
        self.elements.contains_key(selector)
    }

    async fn element_visible(&self, selector: &str) -> bool {
        self.elements.get(selector).is_some_and(|e| e.visible)
    }

    async fn element_text(&self, selector: &str) -> Option<String> {
        self.elements.get(selector).map(|e| e.text.clone())
    }

    async fn current_url(&self) -> Option<String> {
        self.url.clone()
    }
}

/// Evaluate one condition, ignoring `negate`.
///
/// A condition missing the selector or value its kind needs is false.
pub async fn evaluate(condition: &WorkflowCondition, probe: &dyn EnvironmentProbe) -> bool {
    let selector = condition.selector.as_deref();
    let value = condition.value.as_deref();

    match condition.kind {
        ConditionKind::ElementExists => match selector {
            Some(selector) => probe.element_exists(selector).await,
            None => false,
        },
        ConditionKind::ElementVisible => match selector {
            Some(selector) => probe.element_visible(selector).await,
            None => false,
        },
        ConditionKind::TextContains => match (selector, value) {
            (Some(selector), Some(text)) => probe
                .element_text(selector)
                .await
                .is_some_and(|content| content.contains(text)),
            _ => false,
        },
        ConditionKind::UrlMatches => {
            let Some(pattern) = value else {
                return false;
            };
            let regex = match Regex::new(pattern) {
                Ok(regex) => regex,
                Err(e) => {
                    warn!("Invalid url_matches pattern {:?}: {}", pattern, e);
                    return false;
                }
            };
            probe
                .current_url()
                .await
                .is_some_and(|url| regex.is_match(&url))
        }
        ConditionKind::Custom => probe.custom(condition).await,
    }
}

/// Whether every condition holds, applying `negate`. Stops at the first
/// failing condition.
pub async fn evaluate_all(conditions: &[WorkflowCondition], probe: &dyn EnvironmentProbe) -> bool {
    for condition in conditions {
        if evaluate(condition, probe).await == condition.negate {
            return false;
        }
    }
    true
}

#[cfg(test)]
#[path = "conditions_tests.rs"]
mod tests;
