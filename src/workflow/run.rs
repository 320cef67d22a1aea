//! Run Snapshots
//!
//! The persisted state of one workflow run: which workflow it executes,
//! the step index currently being watched, and its start/end timestamps.
//! Status is derived from the `failed` flag and the presence of `end`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a run.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ongoing,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Ongoing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown run status: {}", other)),
        }
    }
}

/// Persisted state of a single run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RunSnapshot {
    /// Name of the workflow this run executes
    pub workflow_name: String,

    /// Index of the step currently being watched
    pub current_step: usize,

    /// Set when a step deadline lapsed
    pub failed: bool,

    /// When the run was initiated
    pub start: DateTime<Utc>,

    /// When the run reached a terminal status
    pub end: Option<DateTime<Utc>>,
}

impl RunSnapshot {
    /// Creates a fresh run at step 0, started now.
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            current_step: 0,
            failed: false,
            start: Utc::now(),
            end: None,
        }
    }

    pub fn status(&self) -> RunStatus {
        if self.failed {
            RunStatus::Failed
        } else if self.end.is_some() {
            RunStatus::Completed
        } else {
            RunStatus::Ongoing
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Moves to the next step and returns its index.
    ///
    /// Terminal runs are left untouched and `None` is returned.
    pub fn advance(&mut self) -> Option<usize> {
        if self.is_terminal() {
            return None;
        }
        self.current_step += 1;
        Some(self.current_step)
    }

    /// Marks the run completed. Returns false if it was already terminal.
    pub fn mark_completed(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.end = Some(Utc::now());
        true
    }

    /// Marks the run failed. Returns false if it was already terminal.
    pub fn mark_failed(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.failed = true;
        self.end = Some(Utc::now());
        true
    }

    /// Wall-clock time between start and end, once the run has ended.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end.map(|end| end - self.start)
    }
}
