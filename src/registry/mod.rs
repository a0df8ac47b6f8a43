//! Entry registry
//!
//! The authoritative set of source files to be bundled. Entries arrive one at
//! a time as the consumer discovers them, so the registry deduplicates by
//! path while preserving registration order; iteration order during a build
//! pass is deterministic.

use std::path::{Path, PathBuf};

/// Deduplicated, order-preserving set of registered entry files
#[derive(Debug, Default)]
pub struct EntryRegistry {
    entries: Vec<PathBuf>,
}

impl EntryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path` if it is not already tracked. Returns whether the entry
    /// was newly added; `false` means the call was a no-op.
    pub fn register(&mut self, path: PathBuf) -> bool {
        if self.contains(&path) {
            return false;
        }
        self.entries.push(path);
        true
    }

    /// Remove `path` unconditionally
    pub fn remove(&mut self, path: &Path) {
        self.entries.retain(|entry| entry != path);
    }

    /// Whether `path` is currently tracked
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|entry| entry == path)
    }

    /// Stable copy of the entry list for iteration during a build pass.
    /// Concurrent mutation of the registry cannot corrupt an iteration over
    /// the snapshot.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.entries.clone()
    }

    /// Number of tracked entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
