//! In-Memory Run Store
//!
//! A `RwLock`-guarded map: reads proceed in parallel, writes are
//! exclusive. A poisoned lock is recovered rather than propagated since
//! every write replaces a whole snapshot.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::RunStore;
use crate::workflow::RunSnapshot;

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, RunSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, RunSnapshot>> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, RunSnapshot>> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RunStore for MemoryStore {
    fn get(&self, run_id: &str) -> Option<RunSnapshot> {
        self.read().get(run_id).cloned()
    }

    fn set(&self, run_id: &str, snapshot: RunSnapshot) {
        self.write().insert(run_id.to_string(), snapshot);
    }

    fn list(&self) -> Vec<(String, RunSnapshot)> {
        self.read()
            .iter()
            .map(|(id, snapshot)| (id.clone(), snapshot.clone()))
            .collect()
    }
}
