//! Packwatch - watch-mode bundle coordination and virtual-file synchronization
//!
//! Packwatch drives one or more bundler compiler instances in continuous
//! watch mode, exposes a dynamically growing set of source entry points to
//! them, and serves compiled output to consumers through an async `read`
//! that waits out in-flight builds rather than ever returning stale or
//! partial bytes. It does no bundling itself: the compiler, the middleware
//! fronting its in-memory output, and the test framework's file list are
//! collaborators behind traits in [`collab`].

pub mod collab;
pub mod config;
pub mod coordinator;
pub mod gate;
pub mod preprocess;
pub mod reader;
pub mod reconcile;
pub mod registry;
pub mod store;

// Re-export commonly used types
pub use collab::{Asset, BuildPass, BuildStats, DevMiddleware, EntryResolution, FileList};
pub use config::{ConfigError, ConfigResult, CoordinatorConfig, LOADER_SEPARATOR, OutputLayout};
pub use coordinator::{BundleCoordinator, CoordinatorError};
pub use gate::{BuildGate, Thunk};
pub use preprocess::{PreprocessError, PreprocessResult, Preprocessor};
pub use reader::{OutputReader, ReadError, ReadResult};
pub use reconcile::FailureReconciler;
pub use registry::EntryRegistry;
pub use store::MemoryStore;
