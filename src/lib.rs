//! Flowwarden - Workflow Deadline Orchestration
//!
//! Tracks runs of named, multi-step workflows. Every step carries a
//! deadline; when a run sits on a step past that deadline, the step's
//! notification URL is told about it and the run is marked failed.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`workflow`]: Workflow definitions, YAML loading and run snapshots
//! - [`execution`]: Orchestration engine, step watchdogs and notifications
//! - [`store`]: Run snapshot persistence
//! - [`error`]: Error types surfaced by the engine and watchdogs
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowwarden::{load_definitions, Engine, MemoryStore};
//! use flowwarden::execution::HttpNotifier;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load workflow definitions from YAML
//!     let definitions = load_definitions("workflows.yaml")?;
//!
//!     // Create the engine with its collaborators
//!     let engine = Engine::new(
//!         definitions,
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(HttpNotifier::new()?),
//!     );
//!
//!     // Start a run and move it along
//!     let run_id = engine.initiate_workflow("user_onboarding")?;
//!     engine.update_workflow(&run_id)?;
//!     engine.complete_workflow(&run_id)?;
//!
//!     // Stop every outstanding watchdog
//!     engine.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod execution;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use error::EngineError;
pub use execution::engine::Engine;
pub use store::{MemoryStore, RunStore};
pub use workflow::model::{Step, Workflow, WorkflowDefinitions};
pub use workflow::parser::load_definitions;
pub use workflow::run::{RunSnapshot, RunStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Flowwarden";

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "Flowwarden");
    }

    #[test]
    fn test_module_exports_definitions() {
        let mut workflow = Workflow::new();
        workflow.push_step("Create account", Duration::from_secs(5), "http://hooks/a");

        let definitions = WorkflowDefinitions::new().with_workflow("onboarding", workflow);
        let step = definitions.step("onboarding", 0).unwrap();
        assert_eq!(step.id, "step0");
        assert_eq!(step.name, "Create account");
    }

    #[test]
    fn test_module_exports_store() {
        let store = MemoryStore::new();
        store.set("r1", RunSnapshot::new("onboarding"));
        assert_eq!(store.get("r1").unwrap().status(), RunStatus::Ongoing);
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
