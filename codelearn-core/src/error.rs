//! Core error helpers
//!
//! Re-exports codelearn-error and adds constructors for failures raised by
//! the collaborators in this crate.

pub use codelearn_error::{Error, ErrorKind, ErrorStatus, Result};

use std::time::Duration;

/// An external call exceeded its deadline. Timeouts count as transient
/// service failures so the retry policy may repeat the call once.
pub fn timed_out(operation: &'static str, limit: Duration) -> Error {
    Error::external_service(format!("{} timed out after {:?}", operation, limit))
        .with_operation(operation)
        .with_context("timeout_ms", limit.as_millis().to_string())
        .temporary()
}

/// Classify an IO failure while reading a source file
pub fn source_read_failed(path: &str, err: std::io::Error) -> Error {
    match err.kind() {
        std::io::ErrorKind::NotFound => Error::file_not_found(path)
            .with_operation("source::read")
            .set_source(err),
        std::io::ErrorKind::PermissionDenied => {
            Error::new(ErrorKind::PermissionDenied, format!("cannot read '{}'", path))
                .with_operation("source::read")
                .with_context("path", path)
                .set_source(err)
        }
        _ => Error::new(ErrorKind::IoFailed, format!("failed to read '{}': {}", path, err))
            .with_operation("source::read")
            .with_context("path", path)
            .set_source(err),
    }
}

/// Wrap a storage IO failure as a persistence error
pub fn persistence_io(operation: &'static str, path: &std::path::Path, err: std::io::Error) -> Error {
    Error::persistence_failed(format!("failed to write {}: {}", path.display(), err))
        .with_operation(operation)
        .with_context("path", path.display().to_string())
        .set_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_out_is_retryable_service_error() {
        let err = timed_out("generator::generate", Duration::from_millis(1500));
        assert_eq!(err.kind(), ErrorKind::ExternalServiceFailed);
        assert!(err.is_retryable());
        assert_eq!(err.context_value("timeout_ms"), Some("1500"));
    }

    #[test]
    fn test_source_read_failed_maps_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = source_read_failed("foo.py", io);
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.operation(), "source::read");
        assert!(!err.is_retryable());
    }
}
