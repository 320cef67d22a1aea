//! Shared fixtures for engine and watchdog tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::workflow::{Workflow, WorkflowDefinitions};

use super::notifier::{Notifier, StepNotification};

pub(crate) fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// `w`: two 50ms steps, `single`: one 20ms step, `empty`: no steps.
pub(crate) fn sample_definitions() -> WorkflowDefinitions {
    let mut two = Workflow::new();
    two.push_step("first", ms(50), "http://hooks/first")
        .push_step("second", ms(50), "http://hooks/second");

    let mut one = Workflow::new();
    one.push_step("only", ms(20), "http://hooks/only");

    WorkflowDefinitions::new()
        .with_workflow("w", two)
        .with_workflow("single", one)
        .with_workflow("empty", Workflow::new())
}

/// Records every delivery; optionally reports each one as failed.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    calls: Mutex<Vec<(String, StepNotification)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, StepNotification)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, url: &str, notification: &StepNotification) -> Result<(), NotifyError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), notification.clone()));

        if self.fail {
            return Err(NotifyError::Rejected { status: 500 });
        }
        Ok(())
    }
}
