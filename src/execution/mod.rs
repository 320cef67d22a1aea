//! Workflow Execution Module
//!
//! Drives runs through their steps and enforces per-step deadlines.
//!
//! # Architecture
//!
//! - [`engine`]: Run lifecycle (initiate, update, complete) and drain
//! - [`listing`]: Filtered, paginated views over stored runs
//! - [`notifier`]: Delivery of missed-deadline notifications
//! - `watchdog`: One background task per armed step

pub mod engine;
pub mod listing;
pub mod notifier;
mod watchdog;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::Engine;
pub use listing::{RunSummary, RunsFilter, RunsPage, DEFAULT_PAGE_SIZE};
pub use notifier::{HttpNotifier, Notifier, StepNotification, DEFAULT_NOTIFY_TIMEOUT};
