//! Step Watchdog
//!
//! One background task per armed step. It races the step's deadline
//! against cancellation with a one-shot timer:
//! - cancelled first: exit silently, no notification, no run mutation
//! - deadline first: notify the step's URL, then fail the run
//!
//! A workflow or step index missing from the definitions ends the
//! watchdog before it arms; the run is left ongoing at its step.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::error::WatchdogError;

use super::engine::Shared;
use super::notifier::StepNotification;

/// What a watchdog is asked to watch.
#[derive(Debug, Clone)]
pub(crate) struct StepWatch {
    pub(crate) run_id: String,
    pub(crate) workflow_name: String,
    pub(crate) index: usize,
    pub(crate) token: CancellationToken,
}

/// How a watchdog ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchOutcome {
    /// Workflow or step index not defined; nothing was armed
    Undefined,
    Cancelled,
    Expired { notified: bool },
}

/// Watches one step of one run until it is cancelled or expires.
pub(crate) async fn watch_step(shared: Arc<Shared>, watch: StepWatch) -> WatchOutcome {
    let Some(step) = shared
        .definitions
        .step(&watch.workflow_name, watch.index)
        .cloned()
    else {
        let err = WatchdogError::UndefinedStep {
            workflow: watch.workflow_name.clone(),
            index: watch.index,
        };
        error!("Run {}: {}; run stays ongoing", watch.run_id, err);
        return WatchOutcome::Undefined;
    };

    debug!(
        "Run {}: watching {} '{}' for {:?}",
        watch.run_id, step.id, step.name, step.deadline
    );

    tokio::select! {
        _ = watch.token.cancelled() => {
            debug!("Run {}: watchdog for {} cancelled", watch.run_id, step.id);
            return WatchOutcome::Cancelled;
        }
        _ = tokio::time::sleep(step.deadline) => {}
    }

    if !shared.claim_expiry(&watch.run_id, &watch.token) {
        debug!(
            "Run {}: {} was advanced as its deadline lapsed",
            watch.run_id, step.id
        );
        return WatchOutcome::Cancelled;
    }

    warn!(
        "Run {}: {} ('{}') of '{}' missed its {:?} deadline",
        watch.run_id, step.id, step.name, watch.workflow_name, step.deadline
    );

    let notification = StepNotification {
        workflow_name: watch.workflow_name.clone(),
        workflow_step: step.id.clone(),
        workflow_run_id: watch.run_id.clone(),
    };

    let notified = match shared.notifier.notify(&step.notify_url, &notification).await {
        Ok(()) => {
            info!("Run {}: notified {}", watch.run_id, step.notify_url);
            true
        }
        Err(source) => {
            let err = WatchdogError::NotificationFailed {
                url: step.notify_url.clone(),
                source,
            };
            error!("Run {}: {}", watch.run_id, err);
            false
        }
    };

    if shared.fail_run(&watch.run_id) {
        info!("Run {} failed at {}", watch.run_id, step.id);
    }

    WatchOutcome::Expired { notified }
}
