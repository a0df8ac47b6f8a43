//! Virtual file reading
//!
//! Resolves a bundle-relative path to compiled bytes from the middleware's
//! virtual output store. With one compiler instance this is a single raw
//! read. With several, the same relative path is read from every instance's
//! indexed root in parallel and the buffers are joined with a newline in
//! index order, presenting the independently-bundled outputs as one merged
//! artifact. The waiting-for-a-build half of the read path lives in the
//! coordinator; this type only performs reads that are safe to run now.

use crate::collab::DevMiddleware;
use crate::config::CoordinatorConfig;
use bytes::{Bytes, BytesMut};
use futures_util::future::try_join_all;
use log::debug;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while reading compiled output
#[derive(Error, Debug)]
pub enum ReadError {
    /// Underlying store error, surfaced verbatim (including not-found)
    #[error("output store error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine went away before the read completed
    #[error("read interrupted before completion")]
    Interrupted,
}

/// Result type for read operations
pub type ReadResult<T> = Result<T, ReadError>;

/// Immediate read path over the compiler set's output store
#[derive(Clone)]
pub struct OutputReader {
    config: CoordinatorConfig,
    middleware: Arc<dyn DevMiddleware>,
}

impl OutputReader {
    pub fn new(config: CoordinatorConfig, middleware: Arc<dyn DevMiddleware>) -> Self {
        Self { config, middleware }
    }

    /// Read the compiled output for a bundle-relative path right now,
    /// without consulting the build state.
    pub async fn read_now(&self, relative: &str) -> ReadResult<Bytes> {
        let relative = relative.replace('\\', "/");
        if self.config.multi() {
            self.read_aggregate(&relative).await
        } else {
            debug!("reading {relative} from single-instance store");
            let path = self.config.virtual_path(0, &relative);
            Ok(self.middleware.read_file(&path).await?)
        }
    }

    /// Parallel fail-fast read across all instance roots, joined with a
    /// newline between consecutive buffers in index order. Any member
    /// failing fails the whole read with that error; no partial bytes.
    async fn read_aggregate(&self, relative: &str) -> ReadResult<Bytes> {
        debug!(
            "reading {relative} across {} instance stores",
            self.config.instances
        );
        let reads = (0..self.config.instances).map(|index| {
            let path = self.config.virtual_path(index, relative);
            let middleware = Arc::clone(&self.middleware);
            async move { middleware.read_file(&path).await }
        });
        let buffers = try_join_all(reads).await?;

        let total: usize = buffers.iter().map(Bytes::len).sum();
        let mut joined = BytesMut::with_capacity(total + buffers.len().saturating_sub(1));
        for (index, buffer) in buffers.iter().enumerate() {
            if index > 0 {
                joined.extend_from_slice(b"\n");
            }
            joined.extend_from_slice(buffer);
        }
        Ok(joined.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::fakes::RecordingMiddleware;

    fn reader(instances: usize, middleware: Arc<RecordingMiddleware>) -> OutputReader {
        let config = CoordinatorConfig {
            instances,
            ..Default::default()
        };
        OutputReader::new(config, middleware)
    }

    #[tokio::test]
    async fn test_single_instance_read_returns_raw_bytes() {
        let middleware = Arc::new(RecordingMiddleware::default());
        middleware.store.write("/_packwatch_/spec/a.js", &b"compiled"[..]);

        let bytes = reader(1, middleware).read_now("spec/a.js").await.unwrap();
        assert_eq!(bytes, Bytes::from("compiled"));
    }

    #[tokio::test]
    async fn test_single_instance_missing_artifact_surfaces_not_found() {
        let middleware = Arc::new(RecordingMiddleware::default());
        let err = reader(1, middleware).read_now("missing.js").await.unwrap_err();
        match err {
            ReadError::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_backslashes_are_normalized_before_lookup() {
        let middleware = Arc::new(RecordingMiddleware::default());
        middleware.store.write("/_packwatch_/spec/a.js", &b"x"[..]);

        let bytes = reader(1, middleware).read_now("spec\\a.js").await.unwrap();
        assert_eq!(bytes, Bytes::from("x"));
    }

    #[tokio::test]
    async fn test_aggregate_read_joins_with_newline_in_index_order() {
        let middleware = Arc::new(RecordingMiddleware::default());
        middleware.store.write("/_packwatch_/0/spec/a.js", &b"a"[..]);
        middleware.store.write("/_packwatch_/1/spec/a.js", &b"b"[..]);

        let bytes = reader(2, middleware).read_now("spec/a.js").await.unwrap();
        assert_eq!(bytes, Bytes::from("a\nb"));
    }

    #[tokio::test]
    async fn test_aggregate_read_fails_fast_with_no_partial_bytes() {
        let middleware = Arc::new(RecordingMiddleware::default());
        // Instance 1 has the artifact, instance 0 does not.
        middleware.store.write("/_packwatch_/1/spec/a.js", &b"b"[..]);

        let err = reader(2, middleware).read_now("spec/a.js").await.unwrap_err();
        match err {
            ReadError::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
