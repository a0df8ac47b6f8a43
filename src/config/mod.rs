//! Engine configuration and virtual output layout
//!
//! The coordinator drives 1..N compiler instances. Each instance writes its
//! artifacts into an in-memory store under a virtual root derived from a
//! namespace prefix. With a single instance all output lives directly under
//! `/_<ns>_/`; with several instances each one gets its own `/_<ns>_/<index>/`
//! segment so the roots never collide.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Token joining a loader/shim reference to the entry it wraps.
pub const LOADER_SEPARATOR: &str = "!";

/// Errors that can occur while validating engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("at least one compiler instance is required")]
    NoInstances,

    #[error("output namespace must not be empty")]
    EmptyNamespace,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration for a [`BundleCoordinator`](crate::BundleCoordinator)
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Base directory entry names are made relative to
    pub base_path: PathBuf,

    /// Number of compiler instances driven as one set (fixed at construction)
    pub instances: usize,

    /// Namespace for the virtual output roots, without underscores or slashes
    pub namespace: String,

    /// Optional environment shim loaded ahead of every entry via loader
    /// syntax. Only applied in multi-instance mode; with a single instance
    /// the platform loads the environment once for the whole bundle.
    pub env_shim: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            instances: 1,
            namespace: "packwatch".to_string(),
            env_shim: None,
        }
    }
}

impl CoordinatorConfig {
    /// Check the configuration for values the engine cannot operate with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.instances == 0 {
            return Err(ConfigError::NoInstances);
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        Ok(())
    }

    /// Whether more than one compiler instance is configured
    pub fn multi(&self) -> bool {
        self.instances > 1
    }

    /// The shared virtual namespace root, e.g. `/_packwatch_/`
    pub fn root(&self) -> String {
        format!("/_{}_/", self.namespace)
    }

    /// The virtual output root of one instance. Indexed only in
    /// multi-instance mode; a single instance owns the namespace root.
    pub fn instance_root(&self, index: usize) -> String {
        if self.multi() {
            format!("{}{}/", self.root(), index)
        } else {
            self.root()
        }
    }

    /// Full virtual path of an artifact inside one instance's store
    pub fn virtual_path(&self, index: usize, relative: &str) -> String {
        format!("{}{}", self.instance_root(index), relative)
    }

    /// Output configuration to apply to one compiler instance
    pub fn output_layout(&self, index: usize) -> OutputLayout {
        OutputLayout {
            path: self.instance_root(index),
            public_path: self.instance_root(index),
            filename: "[name]".to_string(),
            chunk_filename: "[id].chunk.js".to_string(),
            // Distinct chunk-loading globals keep multi-instance bundles
            // from clobbering each other on the same page.
            jsonp_function: self
                .multi()
                .then(|| format!("{}Jsonp{}", self.namespace, index)),
        }
    }

    /// Bundle-relative name of an entry: the path relative to `base_path`
    /// with separators normalized to `/`
    pub fn relative_name(&self, file: &Path) -> String {
        let relative = file.strip_prefix(&self.base_path).unwrap_or(file);
        normalize_separators(relative)
    }

    /// The request string injected into a build pass for one entry. In
    /// multi-instance mode a configured environment shim is prefixed via
    /// loader syntax so it runs before the entry in every bundle.
    pub fn entry_request(&self, file: &Path) -> String {
        let entry = normalize_separators(file);
        match &self.env_shim {
            Some(shim) if self.multi() => {
                format!("{}{}{}", normalize_separators(shim), LOADER_SEPARATOR, entry)
            }
            _ => entry,
        }
    }
}

/// Per-instance output configuration derived from [`CoordinatorConfig`].
///
/// The engine never applies this to a compiler itself; the embedder wiring a
/// real compiler instance reads it when constructing that instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Virtual directory artifacts are written to
    pub path: String,
    /// Public URL prefix artifacts are served under
    pub public_path: String,
    /// Primary asset filename pattern
    pub filename: String,
    /// Chunk asset filename pattern
    pub chunk_filename: String,
    /// Chunk-loading global name, set only in multi-instance mode
    pub jsonp_function: Option<String>,
}

fn normalize_separators(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
