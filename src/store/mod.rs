//! In-memory virtual output store
//!
//! Compiler instances in watch mode keep their artifacts in memory rather
//! than on disk. [`MemoryStore`] is the map backing that virtual filesystem:
//! artifacts are keyed by virtual output path and replaced wholesale on each
//! build pass. Embedders use it to implement the middleware collaborator;
//! the engine itself only ever reads through that collaborator.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

/// Shared in-memory artifact map keyed by virtual output path
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the artifact at `path`
    pub fn write(&self, path: impl Into<String>, contents: impl Into<Bytes>) {
        self.files.write().insert(path.into(), contents.into());
    }

    /// Read the artifact at `path`. A missing artifact surfaces as
    /// [`io::ErrorKind::NotFound`], matching what a filesystem-shaped store
    /// would report.
    pub fn read(&self, path: &str) -> io::Result<Bytes> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no artifact at {path}")))
    }

    /// Remove the artifact at `path`, if present
    pub fn remove(&self, path: &str) {
        self.files.write().remove(path);
    }

    /// Drop all artifacts, as a fresh build pass does before re-emitting
    pub fn clear(&self) {
        self.files.write().clear();
    }

    /// Number of stored artifacts
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether the store holds no artifacts
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}
