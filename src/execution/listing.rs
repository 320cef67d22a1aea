//! Run Listing
//!
//! Filtering and pagination over stored run snapshots, newest first.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::workflow::{RunSnapshot, RunStatus};

/// Page size used when a filter asks for zero.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Selects which runs to list.
#[derive(Debug, Clone, PartialEq)]
pub struct RunsFilter {
    pub status: Option<RunStatus>,
    pub workflow_name: Option<String>,
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

impl Default for RunsFilter {
    fn default() -> Self {
        Self {
            status: None,
            workflow_name: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl RunsFilter {
    fn matches(&self, snapshot: &RunSnapshot) -> bool {
        if let Some(status) = self.status {
            if snapshot.status() != status {
                return false;
            }
        }

        match &self.workflow_name {
            Some(name) => snapshot.workflow_name == *name,
            None => true,
        }
    }
}

/// One row of a run listing.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub workflow_name: String,
    pub current_step: usize,
    pub status: RunStatus,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    /// Milliseconds between start and end, once ended
    pub duration_ms: Option<i64>,
}

impl RunSummary {
    fn new(run_id: String, snapshot: &RunSnapshot) -> Self {
        Self {
            run_id,
            workflow_name: snapshot.workflow_name.clone(),
            current_step: snapshot.current_step,
            status: snapshot.status(),
            start: snapshot.start,
            end: snapshot.end,
            duration_ms: snapshot.duration().map(|d| d.num_milliseconds()),
        }
    }
}

/// A page of run summaries.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunsPage {
    pub runs: Vec<RunSummary>,
    /// Matching runs across all pages
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Filters, orders and paginates `entries`.
///
/// A zero page size falls back to [`DEFAULT_PAGE_SIZE`]; the page number
/// is clamped into `1..=total_pages`.
pub fn paginate(entries: Vec<(String, RunSnapshot)>, filter: &RunsFilter) -> RunsPage {
    let mut runs: Vec<RunSummary> = entries
        .into_iter()
        .filter(|(_, snapshot)| filter.matches(snapshot))
        .map(|(run_id, snapshot)| RunSummary::new(run_id, &snapshot))
        .collect();

    runs.sort_by(|a, b| b.start.cmp(&a.start).then_with(|| a.run_id.cmp(&b.run_id)));

    let total = runs.len();
    let page_size = if filter.page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        filter.page_size
    };
    let total_pages = total.div_ceil(page_size).max(1);
    let page = filter.page.clamp(1, total_pages);

    let runs = runs
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    RunsPage {
        runs,
        total,
        page,
        page_size,
        total_pages,
    }
}
