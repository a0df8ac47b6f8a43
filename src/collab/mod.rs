//! Collaborator interfaces
//!
//! The engine only decides *when* a build runs, *which* entries it includes,
//! and *how* finished output reaches waiting readers. Everything else lives
//! behind these traits: the dev middleware fronting each compiler's virtual
//! output store, the test framework's file list, and the build pass into
//! which entries are injected.

use async_trait::async_trait;
use bytes::Bytes;

/// Middleware fronting the compiler set's virtual output store.
///
/// `invalidate` forces the next build; `close` releases watcher resources on
/// shutdown and is called exactly once by the engine.
#[async_trait]
pub trait DevMiddleware: Send + Sync {
    /// Read the artifact stored at a virtual output path
    async fn read_file(&self, path: &str) -> std::io::Result<Bytes>;

    /// Force the next build pass
    fn invalidate(&self);

    /// Release resources; invoked once during shutdown
    fn close(&self);
}

/// The test framework's view of which files exist.
///
/// `refresh` is invoked exactly when an unsolicited build (no reads waiting)
/// completes with output, so the framework reconsiders which files to
/// preprocess.
pub trait FileList: Send + Sync {
    fn refresh(&self);
}

/// One compiler instance's in-flight build pass, accepting entry injections
#[async_trait]
pub trait BuildPass: Send {
    /// Inject one entry into the pass. `request` is the module request
    /// (possibly shim-wrapped), `name` the bundle-relative output name.
    async fn add_entry(&mut self, request: &str, name: &str) -> EntryResolution;
}

/// Terminal outcome of resolving one injected entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryResolution {
    /// The entry resolved and was added to the pass
    Resolved,
    /// The entry's source file does not exist (missing-file class); the
    /// engine recovers by dropping the entry and forcing a rebuild
    NotFound,
    /// Any other resolution failure; reported through the compiler's own
    /// channel, not recovered here
    Failed(String),
}

/// Per-instance completion report delivered with the `done` signal
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Assets produced by this instance's pass
    pub assets: Vec<Asset>,
    /// How many assets were actually (re-)emitted this pass
    pub emitted: usize,
}

impl BuildStats {
    /// Stats naming the given assets, all counted as emitted
    pub fn with_assets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let assets: Vec<Asset> = names
            .into_iter()
            .map(|name| Asset {
                name: name.into(),
                size: 0,
            })
            .collect();
        let emitted = assets.len();
        Self { assets, emitted }
    }
}

/// One produced artifact as reported in [`BuildStats`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Bundle-relative asset name
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

#[cfg(test)]
pub(crate) mod fakes {
    //! Recording collaborator fakes shared by the engine's test modules.

    use super::*;
    use crate::store::MemoryStore;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Middleware backed by a [`MemoryStore`], counting lifecycle calls
    #[derive(Default)]
    pub struct RecordingMiddleware {
        pub store: MemoryStore,
        pub invalidations: AtomicUsize,
        pub closes: AtomicUsize,
    }

    impl RecordingMiddleware {
        pub fn invalidation_count(&self) -> usize {
            self.invalidations.load(Ordering::SeqCst)
        }

        pub fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DevMiddleware for RecordingMiddleware {
        async fn read_file(&self, path: &str) -> std::io::Result<Bytes> {
            self.store.read(path)
        }

        fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// File list counting `refresh` calls
    #[derive(Default)]
    pub struct RecordingFileList {
        pub refreshes: AtomicUsize,
    }

    impl RecordingFileList {
        pub fn refresh_count(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    impl FileList for RecordingFileList {
        fn refresh(&self) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Build pass recording injected entries; requests containing one of the
    /// configured `missing` fragments resolve as [`EntryResolution::NotFound`]
    #[derive(Default)]
    pub struct ScriptedPass {
        pub entries: Mutex<Vec<(String, String)>>,
        pub missing: Vec<String>,
    }

    impl ScriptedPass {
        pub fn failing_on<S: Into<String>>(fragment: S) -> Self {
            Self {
                missing: vec![fragment.into()],
                ..Default::default()
            }
        }

        pub fn recorded(&self) -> Vec<(String, String)> {
            self.entries.lock().clone()
        }
    }

    #[async_trait]
    impl BuildPass for ScriptedPass {
        async fn add_entry(&mut self, request: &str, name: &str) -> EntryResolution {
            self.entries
                .lock()
                .push((request.to_string(), name.to_string()));
            if self.missing.iter().any(|fragment| request.contains(fragment)) {
                EntryResolution::NotFound
            } else {
                EntryResolution::Resolved
            }
        }
    }
}
