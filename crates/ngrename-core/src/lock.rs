//! File lock table: serializes operations that touch common files.
//!
//! A caller acquires the whole set of paths it will read or write in one
//! step. Acquisition is all-or-nothing, so two renames with overlapping
//! footprints can never each hold half of the other's files.

use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// Exclusive per-path locks.
#[derive(Debug, Default)]
pub struct FileLockTable {
    held: Mutex<BTreeSet<String>>,
    released: Condvar,
}

impl FileLockTable {
    pub fn new() -> Self {
        FileLockTable::default()
    }

    fn held(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until every path is free, then hold them all.
    pub fn acquire<I, S>(&self, paths: I) -> FileLockGuard<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let wanted: BTreeSet<String> = paths.into_iter().map(Into::into).collect();
        let mut held = self.held();
        while wanted.iter().any(|p| held.contains(p)) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.extend(wanted.iter().cloned());
        trace!(paths = wanted.len(), "acquired file locks");
        FileLockGuard {
            table: self,
            paths: wanted,
        }
    }

    fn release(&self, paths: &BTreeSet<String>) {
        let mut held = self.held();
        for path in paths {
            held.remove(path);
        }
        drop(held);
        self.released.notify_all();
    }
}

/// Held locks; released on drop.
#[derive(Debug)]
pub struct FileLockGuard<'a> {
    table: &'a FileLockTable,
    paths: BTreeSet<String>,
}

impl FileLockGuard<'_> {
    pub fn covers(&self, path: &str) -> bool {
        self.paths.contains(path)
    }
}

impl Drop for FileLockGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.paths);
    }
}

// ============================================================================
// Tests
// ============================================================================
