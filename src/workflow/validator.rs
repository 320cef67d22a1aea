//! Workflow Definition Validation
//!
//! Load-time checks on workflow definitions:
//! - Step identifiers match their position (`step0`, `step1`, ...)
//! - Step names are present
//! - Deadlines are non-zero
//! - Notify URLs are present and parse as absolute URLs

use log::{debug, info, warn};
use reqwest::Url;

use super::model::{Step, WorkflowDefinitions};

/// Validation error types for user-friendly error messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyWorkflowName,
    StepIdMismatch {
        workflow: String,
        index: usize,
        found: String,
    },
    EmptyStepName { workflow: String, step: String },
    ZeroDeadline { workflow: String, step: String },
    EmptyNotifyUrl { workflow: String, step: String },
    InvalidNotifyUrl {
        workflow: String,
        step: String,
        url: String,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyWorkflowName => write!(f, "Workflow has empty or whitespace-only name"),
            Self::StepIdMismatch {
                workflow,
                index,
                found,
            } => write!(
                f,
                "Workflow '{}': step at position {} is named '{}', expected '{}'",
                workflow,
                index,
                found,
                Step::id_for(*index)
            ),
            Self::EmptyStepName { workflow, step } => {
                write!(f, "Workflow '{}': step '{}' has no name", workflow, step)
            }
            Self::ZeroDeadline { workflow, step } => {
                write!(f, "Workflow '{}': step '{}' has a zero retryafter", workflow, step)
            }
            Self::EmptyNotifyUrl { workflow, step } => {
                write!(f, "Workflow '{}': step '{}' has no retryurl", workflow, step)
            }
            Self::InvalidNotifyUrl {
                workflow,
                step,
                url,
            } => write!(
                f,
                "Workflow '{}': step '{}' has an invalid retryurl '{}'",
                workflow, step, url
            ),
        }
    }
}

/// Validates a single step's fields.
fn validate_step(workflow: &str, index: usize, step: &Step) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if step.id != Step::id_for(index) {
        errors.push(ValidationError::StepIdMismatch {
            workflow: workflow.to_string(),
            index,
            found: step.id.clone(),
        });
    }

    if step.name.is_empty() {
        errors.push(ValidationError::EmptyStepName {
            workflow: workflow.to_string(),
            step: step.id.clone(),
        });
    }

    if step.deadline.is_zero() {
        errors.push(ValidationError::ZeroDeadline {
            workflow: workflow.to_string(),
            step: step.id.clone(),
        });
    }

    if step.notify_url.is_empty() {
        errors.push(ValidationError::EmptyNotifyUrl {
            workflow: workflow.to_string(),
            step: step.id.clone(),
        });
    } else if Url::parse(&step.notify_url).is_err() {
        errors.push(ValidationError::InvalidNotifyUrl {
            workflow: workflow.to_string(),
            step: step.id.clone(),
            url: step.notify_url.clone(),
        });
    }

    errors
}

/// Validates every workflow definition.
///
/// A workflow with zero steps is legal and only produces a warning.
/// All errors are collected and returned as one message, one per line.
pub fn validate_definitions(definitions: &WorkflowDefinitions) -> Result<(), String> {
    info!("Validating {} workflow definitions", definitions.len());

    let mut all_errors = Vec::new();

    for name in definitions.names() {
        if name.trim().is_empty() {
            all_errors.push(ValidationError::EmptyWorkflowName);
            continue;
        }

        let Some(workflow) = definitions.get_workflow(name) else {
            continue;
        };

        if workflow.is_empty() {
            warn!("Workflow '{}' has no steps; its runs will never be watched", name);
            continue;
        }

        for (index, step) in workflow.steps.iter().enumerate() {
            all_errors.extend(validate_step(name, index, step));
        }

        debug!("Workflow '{}' checked ({} steps)", name, workflow.len());
    }

    if !all_errors.is_empty() {
        let error_messages: Vec<String> = all_errors.iter().map(|e| e.to_string()).collect();
        return Err(error_messages.join("\n"));
    }

    Ok(())
}
