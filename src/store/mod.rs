//! Run Persistence
//!
//! The engine persists run snapshots through the [`RunStore`] trait and
//! never reaches for a process-wide registry. [`MemoryStore`] is the
//! in-process implementation used by the binary and the tests.

pub mod memory;

pub use memory::MemoryStore;

use crate::workflow::RunSnapshot;

/// Thread-safe key-value persistence of run snapshots, keyed by run ID.
///
/// Implementations must tolerate concurrent calls from every public
/// engine operation and every watchdog at once. No multi-key atomicity
/// is expected; the engine serializes access per run itself.
pub trait RunStore: Send + Sync {
    /// Returns the snapshot stored for `run_id`, if any.
    fn get(&self, run_id: &str) -> Option<RunSnapshot>;

    /// Stores `snapshot` under `run_id`, replacing any previous value.
    fn set(&self, run_id: &str, snapshot: RunSnapshot);

    /// Returns every stored run. Used for listing only.
    fn list(&self) -> Vec<(String, RunSnapshot)>;
}
