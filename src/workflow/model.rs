//! Workflow Definition Model
//!
//! Immutable workflow definitions: each workflow is an ordered list of
//! steps, and each step carries the deadline it may stay unadvanced and
//! the URL notified when that deadline lapses.
//!
//! # Example YAML Format
//!
//! ```yaml
//! workflows:
//!   user_onboarding:
//!     - step0:
//!         name: "Create account"
//!         retryafter: "5s"
//!         retryurl: "https://example.com/retry"
//!     - step1:
//!         name: "Send welcome mail"
//!         retryafter: "1m30s"
//!         retryurl: "https://example.com/retry2"
//! ```

use std::collections::HashMap;
use std::time::Duration;

/// Represents a single step in a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Step identifier, `step<index>` for its position in the workflow
    pub id: String,

    /// Human readable name
    pub name: String,

    /// How long the step may stay unadvanced before the run fails
    pub deadline: Duration,

    /// Endpoint notified when the deadline lapses
    pub notify_url: String,
}

impl Step {
    /// Creates a new Step.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use flowwarden::workflow::Step;
    ///
    /// let step = Step::new("step0", "Create account", Duration::from_secs(5), "https://example.com/retry");
    /// assert_eq!(step.id, "step0");
    /// ```
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        deadline: Duration,
        notify_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            deadline,
            notify_url: notify_url.into().trim().to_string(),
        }
    }

    /// Returns the identifier a step at `index` must carry.
    pub fn id_for(index: usize) -> String {
        format!("step{}", index)
    }
}

/// An ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workflow {
    pub steps: Vec<Step>,
}

impl Workflow {
    /// Creates a new empty workflow.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Creates a workflow from a list of steps.
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Appends a step, assigning it the identifier of its position.
    pub fn push_step(
        &mut self,
        name: impl Into<String>,
        deadline: Duration,
        notify_url: impl Into<String>,
    ) -> &mut Self {
        let id = Step::id_for(self.steps.len());
        self.steps.push(Step::new(id, name, deadline, notify_url));
        self
    }

    /// Returns the step at `index`, if any.
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Read-only mapping from workflow name to its definition.
///
/// Built once at startup and shared by the engine and every watchdog.
#[derive(Debug, Clone, Default)]
pub struct WorkflowDefinitions {
    workflows: HashMap<String, Workflow>,
}

impl WorkflowDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a workflow, replacing any previous definition of that name.
    pub fn insert(&mut self, name: impl Into<String>, workflow: Workflow) {
        self.workflows.insert(name.into(), workflow);
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with_workflow(mut self, name: impl Into<String>, workflow: Workflow) -> Self {
        self.insert(name, workflow);
        self
    }

    /// Looks up a workflow by name. Absence is an expected condition.
    pub fn get_workflow(&self, name: &str) -> Option<&Workflow> {
        self.workflows.get(name)
    }

    /// Looks up a single step of a workflow.
    pub fn step(&self, workflow: &str, index: usize) -> Option<&Step> {
        self.get_workflow(workflow).and_then(|w| w.step(index))
    }

    /// Returns workflow names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Iterates over all workflows, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Workflow)> {
        let mut entries: Vec<(&str, &Workflow)> = self
            .workflows
            .iter()
            .map(|(name, w)| (name.as_str(), w))
            .collect();
        entries.sort_unstable_by_key(|(name, _)| *name);
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onboarding() -> Workflow {
        let mut workflow = Workflow::new();
        workflow
            .push_step("Create account", Duration::from_secs(5), "http://hooks/a")
            .push_step("Send welcome mail", Duration::from_secs(90), "http://hooks/b");
        workflow
    }

    #[test]
    fn test_step_creation_trims_fields() {
        let step = Step::new(" step0 ", "  Create ", Duration::from_millis(10), " http://x ");
        assert_eq!(step.id, "step0");
        assert_eq!(step.name, "Create");
        assert_eq!(step.notify_url, "http://x");
    }

    #[test]
    fn test_push_step_assigns_positional_ids() {
        let workflow = onboarding();
        assert_eq!(workflow.len(), 2);
        assert_eq!(workflow.steps[0].id, "step0");
        assert_eq!(workflow.steps[1].id, "step1");
        assert_eq!(workflow.steps[1].deadline, Duration::from_secs(90));
    }

    #[test]
    fn test_step_lookup_out_of_range() {
        let workflow = onboarding();
        assert!(workflow.step(1).is_some());
        assert!(workflow.step(2).is_none());
    }

    #[test]
    fn test_definitions_lookup() {
        let defs = WorkflowDefinitions::new()
            .with_workflow("onboarding", onboarding())
            .with_workflow("empty", Workflow::new());

        assert_eq!(defs.len(), 2);
        assert_eq!(defs.names(), vec!["empty", "onboarding"]);
        assert_eq!(
            defs.step("onboarding", 0).map(|s| s.name.as_str()),
            Some("Create account")
        );
        assert!(defs.step("onboarding", 5).is_none());
        assert!(defs.step("missing", 0).is_none());
        assert!(defs.get_workflow("empty").is_some_and(Workflow::is_empty));
    }

    #[test]
    fn test_iter_is_sorted_by_name() {
        let defs = WorkflowDefinitions::new()
            .with_workflow("onboarding", onboarding())
            .with_workflow("billing", Workflow::new());

        let listed: Vec<(&str, usize)> = defs.iter().map(|(name, w)| (name, w.len())).collect();
        assert_eq!(listed, vec![("billing", 0), ("onboarding", 2)]);
    }

    #[test]
    fn test_insert_replaces_definition() {
        let mut defs = WorkflowDefinitions::new();
        defs.insert("w", onboarding());
        defs.insert("w", Workflow::new());
        assert_eq!(defs.len(), 1);
        assert!(defs.get_workflow("w").is_some_and(Workflow::is_empty));
    }
}
