//! # AgentFlow Workflow
//!
//! Multi-step workflows over the agent runtime.
//!
//! ## Features
//!
//! - Step graphs with success/failure edges and `abort`
//! - Condition gates evaluated through an [`EnvironmentProbe`]
//! - `{{name}}` placeholders resolved from variables and step results
//! - Pause, resume, and cancel of live runs
//! - Interval scheduling

mod builder;
pub mod conditions;
mod context;
pub mod definition;
mod engine;
mod error;
mod events;
mod schedule;
pub mod variables;

pub use agentflow_config::{UnhandledFailure, WorkflowConfig};
pub use builder::WorkflowBuilder;
pub use conditions::{ConditionKind, EnvironmentProbe, NullProbe, StaticProbe, WorkflowCondition};
pub use context::{WorkflowContext, WorkflowResult, WorkflowState};
pub use definition::{
    DomAction, DomActionOptions, DomActionType, StepAction, StepEdge, TaskTemplate, Variables,
    WorkflowDefinition, WorkflowSchedule, WorkflowStep,
};
pub use engine::WorkflowEngine;
pub use error::WorkflowError;
pub use events::WorkflowEvent;
pub use variables::Resolver;
