//! `{{name}}` placeholder resolution.
//!
//! Only string leaves are rewritten. A string that is exactly one
//! placeholder takes the referenced value with its JSON type; a placeholder
//! embedded in longer text is replaced by the value's text form. Names are
//! looked up in the run variables first, then in earlier step results.
//! Unknown names are left as written.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use agentflow_protocols::Payload;

use crate::definition::{DomAction, StepAction, TaskTemplate, Variables};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder regex"));

/// Resolves placeholders against one run's state.
///
/// Embedded string values, step results included, are inserted without
/// JSON quotes; other values are inserted as compact JSON.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    variables: &'a Variables,
    step_results: &'a Variables,
}

impl<'a> Resolver<'a> {
    pub fn new(variables: &'a Variables, step_results: &'a Variables) -> Self {
        Self {
            variables,
            step_results,
        }
    }

    fn lookup(&self, name: &str) -> Option<&'a Value> {
        self.variables
            .get(name)
            .or_else(|| self.step_results.get(name))
    }

    /// Substitute placeholders inside a string.
    pub fn resolve_str<'s>(&self, input: &'s str) -> Cow<'s, str> {
        PLACEHOLDER.replace_all(input, |caps: &Captures<'_>| match self.lookup(&caps[1]) {
            Some(value) => text_form(value),
            None => caps[0].to_string(),
        })
    }

    /// Substitute placeholders in every string leaf of `value`.
    pub fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => self.resolve_leaf(s),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.resolve_value(v)).collect()),
            Value::Object(map) => Value::Object(self.resolve_map(map)),
            other => other.clone(),
        }
    }

    fn resolve_map(&self, map: &Payload) -> Payload {
        map.iter()
            .map(|(k, v)| (k.clone(), self.resolve_value(v)))
            .collect()
    }

    fn resolve_leaf(&self, s: &str) -> Value {
        if let Some(caps) = PLACEHOLDER.captures(s) {
            if caps[0].len() == s.len() {
                if let Some(value) = self.lookup(&caps[1]) {
                    return value.clone();
                }
            }
        }
        Value::String(self.resolve_str(s).into_owned())
    }

    /// A copy of `action` with placeholders resolved.
    pub fn resolve_action(&self, action: &StepAction) -> StepAction {
        match action {
            StepAction::Dom(dom) => StepAction::Dom(DomAction {
                action_type: dom.action_type,
                selector: dom.selector.as_deref().map(|s| self.resolve_str(s).into_owned()),
                value: dom.value.as_deref().map(|s| self.resolve_str(s).into_owned()),
                options: {
                    let mut options = dom.options.clone();
                    options.extra = self.resolve_map(&dom.options.extra);
                    options
                },
            }),
            StepAction::Task(template) => StepAction::Task(TaskTemplate {
                task_type: self.resolve_str(&template.task_type).into_owned(),
                payload: self.resolve_map(&template.payload),
                ..template.clone()
            }),
        }
    }
}

/// Strings as-is, everything else as compact JSON.
fn text_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "variables_tests.rs"]
mod tests;
