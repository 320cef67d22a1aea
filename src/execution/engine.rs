//! Workflow Orchestration Engine
//!
//! The engine owns every run's lifecycle:
//! - Initiating runs and arming a watchdog for step 0
//! - Advancing runs, replacing the armed watchdog with one for the next step
//! - Completing runs, disarming their watchdog
//! - Draining outstanding watchdogs on shutdown
//!
//! Each run has at most one armed watchdog. Its cancellation token lives
//! in a per-run [`RunControl`] behind its own lock, so operations on one
//! run are serialized while different runs proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::error::EngineError;
use crate::store::RunStore;
use crate::workflow::{RunSnapshot, WorkflowDefinitions};

use super::listing::{paginate, RunsFilter, RunsPage};
use super::notifier::Notifier;
use super::watchdog::{watch_step, StepWatch};

/// Watchdog bookkeeping of a single run.
#[derive(Debug)]
pub(crate) struct RunControl {
    /// Cancels the currently armed watchdog
    cancel: CancellationToken,
    /// Step index the armed watchdog is watching
    step: usize,
    /// Set once the run left the registry; holders of a stale handle must bail out
    retired: bool,
}

/// State shared by the engine handle and all watchdog tasks.
pub(crate) struct Shared {
    pub(crate) definitions: WorkflowDefinitions,
    pub(crate) store: Arc<dyn RunStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    controls: Mutex<HashMap<String, Arc<Mutex<RunControl>>>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    /// Draining flag. Operations that arm a watchdog hold it shared until
    /// the spawn is done; shutdown flips it exclusively.
    draining: RwLock<bool>,
}

/// Locks a mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn control(&self, run_id: &str) -> Option<Arc<Mutex<RunControl>>> {
        lock(&self.controls).get(run_id).cloned()
    }

    /// Registers a fresh control entry with its first watchdog token.
    pub(crate) fn register(&self, run_id: &str, cancel: CancellationToken, step: usize) {
        let control = RunControl {
            cancel,
            step,
            retired: false,
        };
        lock(&self.controls).insert(run_id.to_string(), Arc::new(Mutex::new(control)));
    }

    /// Removes a run from the registry. Caller holds the control's lock.
    fn retire(&self, run_id: &str, control: &mut RunControl) {
        control.retired = true;
        lock(&self.controls).remove(run_id);
    }

    /// Claims the run for an expired watchdog.
    ///
    /// Returns false when cancellation landed before the claim, in which
    /// case the watchdog must exit silently.
    pub(crate) fn claim_expiry(&self, run_id: &str, token: &CancellationToken) -> bool {
        let Some(control) = self.control(run_id) else {
            return false;
        };
        let mut control = lock(&control);

        if control.retired || token.is_cancelled() {
            return false;
        }

        self.retire(run_id, &mut control);
        true
    }

    /// Persists the Failed transition of a claimed run.
    pub(crate) fn fail_run(&self, run_id: &str) -> bool {
        let Some(mut snapshot) = self.store.get(run_id) else {
            warn!("Run {} vanished from the store before it could be failed", run_id);
            return false;
        };

        if !snapshot.mark_failed() {
            return false;
        }

        self.store.set(run_id, snapshot);
        true
    }

    /// Error for a run whose control entry is gone.
    fn missing_or_finished(&self, run_id: &str) -> EngineError {
        match self.store.get(run_id) {
            Some(snapshot) if snapshot.is_terminal() => EngineError::RunFinished {
                run_id: run_id.to_string(),
                status: snapshot.status(),
            },
            Some(_) => EngineError::RunStateMissing(run_id.to_string()),
            None => EngineError::RunNotFound(run_id.to_string()),
        }
    }
}

/// Workflow orchestration engine.
///
/// Cheap to clone; clones share the same runs. All operations that arm
/// a watchdog must be called from within a Tokio runtime.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use flowwarden::execution::{Engine, HttpNotifier};
/// use flowwarden::store::MemoryStore;
/// use flowwarden::workflow::load_definitions;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let definitions = load_definitions("workflows.yaml")?;
///     let engine = Engine::new(
///         definitions,
///         Arc::new(MemoryStore::new()),
///         Arc::new(HttpNotifier::new()?),
///     );
///
///     let run_id = engine.initiate_workflow("user_onboarding")?;
///     engine.update_workflow(&run_id)?;
///     engine.complete_workflow(&run_id)?;
///
///     engine.shutdown().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// Creates an engine over the given definitions, run store and notifier.
    pub fn new(
        definitions: WorkflowDefinitions,
        store: Arc<dyn RunStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                definitions,
                store,
                notifier,
                controls: Mutex::new(HashMap::new()),
                tracker: TaskTracker::new(),
                shutdown: CancellationToken::new(),
                draining: RwLock::new(false),
            }),
        }
    }

    /// Returns the workflow definitions this engine watches.
    pub fn workflows(&self) -> &WorkflowDefinitions {
        &self.shared.definitions
    }

    /// Starts a new run of `workflow_name` and returns its ID.
    ///
    /// The step 0 watchdog runs in the background; this call never waits
    /// on it. Whether the workflow exists is checked by the watchdog, not
    /// here.
    pub fn initiate_workflow(&self, workflow_name: &str) -> Result<String, EngineError> {
        let _accepting = self.ensure_accepting()?;

        let run_id = Uuid::new_v4().to_string();
        let token = self.shared.shutdown.child_token();

        self.shared.register(&run_id, token.clone(), 0);
        self.shared.store.set(&run_id, RunSnapshot::new(workflow_name));
        self.arm(&run_id, workflow_name, 0, token);

        info!("Run {} initiated for workflow '{}'", run_id, workflow_name);
        Ok(run_id)
    }

    /// Advances a run by one step and returns the new step index.
    ///
    /// Not idempotent: two calls advance two steps.
    pub fn update_workflow(&self, run_id: &str) -> Result<usize, EngineError> {
        let _accepting = self.ensure_accepting()?;

        if self.shared.store.get(run_id).is_none() {
            return Err(EngineError::RunNotFound(run_id.to_string()));
        }

        let control = self
            .shared
            .control(run_id)
            .ok_or_else(|| self.shared.missing_or_finished(run_id))?;
        let mut control = lock(&control);

        if control.retired {
            return Err(self.shared.missing_or_finished(run_id));
        }

        let mut snapshot = self
            .shared
            .store
            .get(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;

        let Some(next) = snapshot.advance() else {
            return Err(EngineError::RunFinished {
                run_id: run_id.to_string(),
                status: snapshot.status(),
            });
        };

        control.cancel.cancel();
        debug!("Run {}: watchdog for step {} disarmed", run_id, control.step);

        let token = self.shared.shutdown.child_token();
        control.cancel = token.clone();
        control.step = next;

        let workflow_name = snapshot.workflow_name.clone();
        self.shared.store.set(run_id, snapshot);
        self.arm(run_id, &workflow_name, next, token);

        info!("Run {} advanced to step {}", run_id, next);
        Ok(next)
    }

    /// Completes a run successfully, disarming its watchdog.
    ///
    /// Allowed while the engine drains.
    pub fn complete_workflow(&self, run_id: &str) -> Result<(), EngineError> {
        if self.shared.store.get(run_id).is_none() {
            return Err(EngineError::RunNotFound(run_id.to_string()));
        }

        let control = self
            .shared
            .control(run_id)
            .ok_or_else(|| self.shared.missing_or_finished(run_id))?;
        let mut control = lock(&control);

        if control.retired {
            return Err(self.shared.missing_or_finished(run_id));
        }

        let mut snapshot = self
            .shared
            .store
            .get(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;

        if !snapshot.mark_completed() {
            return Err(EngineError::RunFinished {
                run_id: run_id.to_string(),
                status: snapshot.status(),
            });
        }

        control.cancel.cancel();
        let step = control.step;
        self.shared.retire(run_id, &mut control);
        self.shared.store.set(run_id, snapshot);

        info!("Run {} completed at step {}", run_id, step);
        Ok(())
    }

    /// Returns the persisted snapshot of a run.
    pub fn run(&self, run_id: &str) -> Option<RunSnapshot> {
        self.shared.store.get(run_id)
    }

    /// Lists runs matching `filter`, newest first, one page at a time.
    pub fn list_runs(&self, filter: &RunsFilter) -> RunsPage {
        paginate(self.shared.store.list(), filter)
    }

    /// Number of watchdog tasks that have not exited yet.
    pub fn outstanding_watchdogs(&self) -> usize {
        self.shared.tracker.len()
    }

    /// Returns true once [`shutdown`](Self::shutdown) has begun.
    pub fn is_draining(&self) -> bool {
        *self.draining_flag()
    }

    /// Drains the engine.
    ///
    /// Stops arming watchdogs, cancels every armed one and waits until
    /// all watchdog tasks have exited. A watchdog already delivering a
    /// notification finishes that delivery first. Runs are left as they
    /// are; ongoing runs stay ongoing.
    pub async fn shutdown(&self) {
        let first = {
            let mut draining = self
                .shared
                .draining
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            !std::mem::replace(&mut *draining, true)
        };

        if first {
            info!(
                "Draining engine ({} outstanding watchdogs)",
                self.shared.tracker.len()
            );
        }

        self.shared.shutdown.cancel();
        self.shared.tracker.close();
        self.shared.tracker.wait().await;

        info!("All watchdogs stopped");
    }

    fn draining_flag(&self) -> RwLockReadGuard<'_, bool> {
        self.shared
            .draining
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Holds off shutdown until the returned guard drops, so any watchdog
    /// spawned meanwhile is counted by the drain.
    fn ensure_accepting(&self) -> Result<RwLockReadGuard<'_, bool>, EngineError> {
        let draining = self.draining_flag();
        if *draining {
            return Err(EngineError::ShuttingDown);
        }
        Ok(draining)
    }

    /// Spawns the watchdog for `index` of a run.
    fn arm(&self, run_id: &str, workflow_name: &str, index: usize, token: CancellationToken) {
        let watch = StepWatch {
            run_id: run_id.to_string(),
            workflow_name: workflow_name.to_string(),
            index,
            token,
        };
        self.shared
            .tracker
            .spawn(watch_step(Arc::clone(&self.shared), watch));
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> Arc<Shared> {
        Arc::clone(&self.shared)
    }
}
