//! Interval scheduling of registered workflows.

use std::sync::{Arc, Weak};

use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::definition::WorkflowDefinition;
use crate::engine::WorkflowEngine;
use crate::error::WorkflowError;

/// Run `workflow` every `period` until `token` fires or the engine is
/// dropped. A tick that finds the previous run still going is skipped.
pub(crate) async fn run_interval(
    engine: Weak<WorkflowEngine>,
    workflow: Arc<WorkflowDefinition>,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(engine) = engine.upgrade() else {
            break;
        };
        match engine.execute_workflow(&workflow, None).await {
            Ok(result) => debug!(
                "Scheduled run of workflow {} finished: success={}",
                workflow.id, result.success
            ),
            Err(WorkflowError::AlreadyRunning(_)) => {
                debug!("Workflow {} still running, skipping tick", workflow.id)
            }
            Err(e) => warn!("Scheduled run of workflow {} failed: {}", workflow.id, e),
        }
    }

    debug!("Schedule for workflow {} stopped", workflow.id);
}
