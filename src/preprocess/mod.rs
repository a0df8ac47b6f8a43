//! Preprocessing entry point for the test framework
//!
//! The framework hands each discovered test source file to
//! [`Preprocessor::process`], which registers it with the coordinator
//! (forcing a rebuild the first time a file is seen) and then reads back the
//! compiled bundle for that file, waiting out any build in flight. The
//! returned text is what the framework serves in place of the original
//! source.

use crate::coordinator::BundleCoordinator;
use crate::reader::ReadError;
use log::debug;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while preprocessing a source file
#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("compiled output is not valid UTF-8: {0}")]
    NonUtf8(#[from] std::string::FromUtf8Error),
}

/// Result type for preprocessing operations
pub type PreprocessResult<T> = Result<T, PreprocessError>;

/// Register-then-read consumer flow over a [`BundleCoordinator`]
pub struct Preprocessor {
    coordinator: BundleCoordinator,
}

impl Preprocessor {
    pub fn new(coordinator: BundleCoordinator) -> Self {
        Self { coordinator }
    }

    /// Replace one source file with its compiled bundle. Blocks (via the
    /// coordinator's deferred read, never a thread block) until a build with
    /// output for the file has completed.
    pub async fn process(&self, file: &Path) -> PreprocessResult<String> {
        debug!("preprocessing {}", file.display());
        self.coordinator.register(file.to_path_buf());

        let relative = self.coordinator.config().relative_name(file);
        let bytes = self.coordinator.read(&relative).await?;
        debug!("content loaded for {}", file.display());
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::fakes::{RecordingFileList, RecordingMiddleware};
    use crate::collab::{DevMiddleware, FileList};
    use crate::config::CoordinatorConfig;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn preprocessor() -> (Preprocessor, Arc<RecordingMiddleware>) {
        let middleware = Arc::new(RecordingMiddleware::default());
        let file_list = Arc::new(RecordingFileList::default());
        let coordinator = BundleCoordinator::new(
            CoordinatorConfig {
                base_path: PathBuf::from("/base"),
                ..Default::default()
            },
            Arc::clone(&middleware) as Arc<dyn DevMiddleware>,
            file_list as Arc<dyn FileList>,
        )
        .unwrap();
        (Preprocessor::new(coordinator), middleware)
    }

    #[tokio::test]
    async fn test_process_registers_and_returns_compiled_text() {
        let (preprocessor, middleware) = preprocessor();
        middleware
            .store
            .write("/_packwatch_/spec/a.spec.js", &b"compiled text"[..]);

        let text = preprocessor.process(Path::new("/base/spec/a.spec.js")).await.unwrap();
        assert_eq!(text, "compiled text");
        assert_eq!(middleware.invalidation_count(), 1);
    }

    #[tokio::test]
    async fn test_repeat_processing_does_not_reinvalidate() {
        let (preprocessor, middleware) = preprocessor();
        middleware
            .store
            .write("/_packwatch_/spec/a.spec.js", &b"compiled"[..]);

        let file = Path::new("/base/spec/a.spec.js");
        preprocessor.process(file).await.unwrap();
        preprocessor.process(file).await.unwrap();
        assert_eq!(middleware.invalidation_count(), 1);
    }

    #[tokio::test]
    async fn test_non_utf8_output_is_an_error() {
        let (preprocessor, middleware) = preprocessor();
        middleware
            .store
            .write("/_packwatch_/spec/a.spec.js", &[0xff, 0xfe, 0x00][..]);

        let err = preprocessor
            .process(Path::new("/base/spec/a.spec.js"))
            .await
            .unwrap_err();
        assert!(matches!(err, PreprocessError::NonUtf8(_)));
    }

    #[tokio::test]
    async fn test_missing_output_surfaces_read_error() {
        let (preprocessor, _middleware) = preprocessor();
        let err = preprocessor
            .process(Path::new("/base/spec/a.spec.js"))
            .await
            .unwrap_err();
        assert!(matches!(err, PreprocessError::Read(_)));
    }
}
