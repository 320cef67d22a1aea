//! Workflow Definition Module
//!
//! Provides the read-only workflow definitions and the run snapshots
//! the engine persists.
//!
//! # Structure
//!
//! - [`model`]: Definition data structures (Step, Workflow, WorkflowDefinitions)
//! - [`parser`]: YAML parsing and loading
//! - [`validator`]: Load-time validation rules
//! - [`run`]: Persisted run state (RunSnapshot, RunStatus)

pub mod model;
pub mod parser;
pub mod run;
pub mod validator;

pub use model::{Step, Workflow, WorkflowDefinitions};
pub use parser::{load_definitions, parse_definitions, parse_duration};
pub use run::{RunSnapshot, RunStatus};
pub use validator::{validate_definitions, ValidationError};
