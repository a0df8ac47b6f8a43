//! Entry failure reconciliation
//!
//! A registered source file can disappear between discovery and the build
//! pass that tries to resolve it. Left alone, the dead entry would fail
//! every subsequent build permanently. When a build pass reports the
//! missing-file class of resolution failure, the reconciler drops the entry
//! from the registry and invalidates the middleware so the next read forces
//! a corrected rebuild instead of serving the broken output.

use crate::collab::{DevMiddleware, EntryResolution};
use crate::coordinator::EngineState;
use log::error;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Drops unresolvable entries and forces the rebuild that corrects for them
pub struct FailureReconciler {
    state: Arc<Mutex<EngineState>>,
    middleware: Arc<dyn DevMiddleware>,
}

impl FailureReconciler {
    pub(crate) fn new(
        state: Arc<Mutex<EngineState>>,
        middleware: Arc<dyn DevMiddleware>,
    ) -> Self {
        Self { state, middleware }
    }

    /// Inspect one entry's resolution outcome. Returns whether the entry was
    /// dropped. Only the missing-file class is recovered here; other
    /// failures surface through the compiler's own reporting channel.
    ///
    /// Must be called without the engine state lock held: the middleware
    /// invalidation may re-enter the engine.
    pub(crate) fn reconcile(&self, file: &Path, resolution: &EntryResolution) -> bool {
        match resolution {
            EntryResolution::NotFound => {
                error!("entry {} no longer resolves, dropping it", file.display());
                self.state.lock().registry.remove(file);
                self.middleware.invalidate();
                true
            }
            EntryResolution::Resolved | EntryResolution::Failed(_) => false,
        }
    }
}
