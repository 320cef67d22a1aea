//! Engine Error Types
//!
//! Errors surfaced by the public engine operations, plus the errors a
//! step watchdog can hit internally. Watchdog errors never reach a
//! caller; they are logged and end that watchdog only.

use thiserror::Error;

use crate::workflow::RunStatus;

/// Errors returned by [`Engine`](crate::execution::Engine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No persisted run exists for the identifier.
    #[error("no data found for run ID: {0}")]
    RunNotFound(String),

    /// The run exists but its watchdog control entry is gone.
    #[error("run information missing for run ID: {0}. Did a previous step fail?")]
    RunStateMissing(String),

    /// The run already reached a terminal status.
    #[error("run {run_id} has already finished ({status})")]
    RunFinished { run_id: String, status: RunStatus },

    /// The engine is draining and arms no new watchdogs.
    #[error("engine is shutting down")]
    ShuttingDown,
}

impl EngineError {
    /// True when the error points at a bad request rather than internal state.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::RunNotFound(_) | Self::RunFinished { .. })
    }
}

/// Failures observed inside a step watchdog.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("workflow '{workflow}' has no step at index {index}")]
    UndefinedStep { workflow: String, index: usize },

    #[error("notification to {url} failed: {source}")]
    NotificationFailed {
        url: String,
        #[source]
        source: NotifyError,
    },
}

/// Failures of a single notifier delivery attempt.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint rejected notification with HTTP {status}")]
    Rejected { status: u16 },
}
