//! Compiler lifecycle coordination
//!
//! [`BundleCoordinator`] drives a set of compiler instances running in watch
//! mode. The compiler driver delivers lifecycle signals as method calls:
//! `on_invalid` when a watched file changes, `on_make` once per build pass
//! per instance to receive entry injections, and `on_done` once per pass per
//! instance with that instance's build statistics. Consumers register entry
//! files as they discover them and read compiled output through an async
//! `read` that suspends while a build is in flight.
//!
//! State machine over the whole set:
//! `Idle --invalid--> Building --done(assets>0)--> Idle`;
//! a done with zero assets leaves the state Building and every queued read
//! pending; an invalid while already building preserves the queue.

use crate::collab::{BuildPass, BuildStats, DevMiddleware, FileList};
use crate::config::{ConfigError, CoordinatorConfig};
use crate::gate::BuildGate;
use crate::reader::{OutputReader, ReadError, ReadResult};
use crate::reconcile::FailureReconciler;
use crate::registry::EntryRegistry;
use bytes::Bytes;
use log::debug;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Errors that can occur while constructing a coordinator
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a tokio runtime is required to schedule deferred reads")]
    NoRuntime,
}

/// Mutable engine state, serialized behind one lock.
///
/// Collaborator calls are always made with the lock released so a
/// collaborator that re-enters the engine cannot deadlock it.
#[derive(Default)]
pub(crate) struct EngineState {
    pub(crate) registry: EntryRegistry,
    pub(crate) gate: BuildGate,
    pub(crate) pending_stats: Vec<BuildStats>,
}

struct Inner {
    config: CoordinatorConfig,
    state: Arc<Mutex<EngineState>>,
    middleware: Arc<dyn DevMiddleware>,
    file_list: Arc<dyn FileList>,
    reader: OutputReader,
    reconciler: FailureReconciler,
    closed: AtomicBool,
    runtime: Handle,
}

/// Coordinates builds across a compiler set and serves their output
#[derive(Clone)]
pub struct BundleCoordinator {
    inner: Arc<Inner>,
}

impl BundleCoordinator {
    /// Create a coordinator for the given compiler set configuration.
    ///
    /// Must be called from within a tokio runtime; deferred reads are
    /// re-scheduled onto the runtime captured here.
    pub fn new(
        config: CoordinatorConfig,
        middleware: Arc<dyn DevMiddleware>,
        file_list: Arc<dyn FileList>,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| CoordinatorError::NoRuntime)?;

        let state = Arc::new(Mutex::new(EngineState::default()));
        let reader = OutputReader::new(config.clone(), Arc::clone(&middleware));
        let reconciler = FailureReconciler::new(Arc::clone(&state), Arc::clone(&middleware));

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state,
                middleware,
                file_list,
                reader,
                reconciler,
                closed: AtomicBool::new(false),
                runtime,
            }),
        })
    }

    /// The configuration this coordinator was built with
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Track `file` for inclusion in every subsequent build pass. Returns
    /// whether the entry is new; a new entry invalidates the middleware so
    /// the next build picks it up.
    pub fn register(&self, file: impl Into<PathBuf>) -> bool {
        let file = file.into();
        let added = self.inner.state.lock().registry.register(file.clone());
        if added {
            debug!("new entry {}, forcing a rebuild", file.display());
            self.inner.middleware.invalidate();
        }
        added
    }

    /// Stable copy of the currently registered entries
    pub fn entries(&self) -> Vec<PathBuf> {
        self.inner.state.lock().registry.snapshot()
    }

    /// Whether a build pass is currently in flight
    pub fn is_building(&self) -> bool {
        self.inner.state.lock().gate.is_building()
    }

    /// Number of reads waiting on the next completed build
    pub fn pending_reads(&self) -> usize {
        self.inner.state.lock().gate.pending()
    }

    /// A member compiler signalled that its watcher went invalid. Enters the
    /// building state; idempotent while already building.
    pub fn on_invalid(&self) {
        let mut state = self.inner.state.lock();
        debug!(
            "compiler invalid, {} reads already waiting",
            state.gate.pending()
        );
        state.gate.open();
    }

    /// A member compiler opened a build pass; inject every registered entry
    /// into it. Entries that fail to resolve because their source file is
    /// gone are handed to the reconciler.
    pub async fn on_make(&self, pass: &mut dyn BuildPass) {
        let files = self.inner.state.lock().registry.snapshot();
        debug!("make pass, injecting {} entries", files.len());
        for file in files {
            let request = self.inner.config.entry_request(&file);
            let name = self.inner.config.relative_name(&file);
            let resolution = pass.add_entry(&request, &name).await;
            self.inner.reconciler.reconcile(&file, &resolution);
        }
    }

    /// A member compiler finished its pass. Reports are aggregated until
    /// every instance has delivered one, then the batch is evaluated as a
    /// single logical completion.
    pub fn on_done(&self, stats: BuildStats) {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        state.pending_stats.push(stats);
        if state.pending_stats.len() < inner.config.instances {
            return;
        }
        let batch = std::mem::take(&mut state.pending_stats);
        let asset_count: usize = batch.iter().map(|stats| stats.assets.len()).sum();
        let has_assets = asset_count > 0;

        // Evaluated before any release: a build nobody waited on is the
        // unsolicited case, reported to the file list below.
        let nobody_waiting = state.gate.pending() == 0;

        let thunks = if state.gate.is_building() && has_assets {
            debug!(
                "compiler set done, releasing {} queued reads",
                state.gate.pending()
            );
            Some(state.gate.release())
        } else {
            debug!(
                "compiler set done, not releasing (building={}, assets={asset_count})",
                state.gate.is_building()
            );
            None
        };
        drop(state);

        if nobody_waiting {
            debug!("unsolicited build completed, refreshing the file list");
            inner.file_list.refresh();
        }
        if let Some(thunks) = thunks {
            for thunk in thunks {
                thunk();
            }
        }
    }

    /// Read the compiled output for a bundle-relative path.
    ///
    /// Completes exactly once: immediately when the set is idle, otherwise
    /// after the next build pass that produces output. A queued read is
    /// re-issued from scratch when released, never served from a buffer
    /// captured before the build finished.
    pub async fn read(&self, relative: &str) -> ReadResult<Bytes> {
        let relative = relative.replace('\\', "/");
        let (tx, rx) = oneshot::channel();
        self.inner.issue_read(relative, tx);
        rx.await.unwrap_or(Err(ReadError::Interrupted))
    }

    /// Release collaborator resources. Safe to call more than once; the
    /// middleware is closed exactly once.
    pub fn shutdown(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!("shutting down, closing middleware");
            self.inner.middleware.close();
        }
    }
}

impl Inner {
    /// Serve one read request: run it now if idle, otherwise park it on the
    /// gate. The parked thunk re-issues the request on a fresh scheduling
    /// turn so a build that restarted in the interim is observed before any
    /// bytes are read.
    fn issue_read(self: &Arc<Self>, relative: String, tx: oneshot::Sender<ReadResult<Bytes>>) {
        let mut state = self.state.lock();
        if state.gate.is_building() {
            debug!("build in flight, queueing read for {relative}");
            let inner = Arc::clone(self);
            state.gate.enqueue(Box::new(move || {
                let runtime = inner.runtime.clone();
                runtime.spawn(async move {
                    inner.issue_read(relative, tx);
                });
            }));
        } else {
            drop(state);
            debug!("reading {relative} immediately");
            let reader = self.reader.clone();
            self.runtime.spawn(async move {
                let _ = tx.send(reader.read_now(&relative).await);
            });
        }
    }
}
