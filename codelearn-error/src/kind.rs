//! Error kinds for codelearn operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on the kind to decide how to report a failure; the
/// retry decision is carried separately by [`ErrorStatus`](crate::ErrorStatus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// Catch-all for cases nothing else describes
    Unexpected,

    /// Invalid configuration (missing credential, bad number, unknown provider)
    ConfigInvalid,

    // =========================================================================
    // Source / filesystem errors
    // =========================================================================
    /// Source file does not exist
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// Other IO failure
    IoFailed,

    // =========================================================================
    // External collaborators
    // =========================================================================
    /// Text-generation backend failed, timed out, or returned nothing usable
    ExternalServiceFailed,

    /// A local external tool (git) is missing or exited with an error
    ExternalToolFailed,

    /// The persistence sink could not store the document
    PersistenceFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",

            ErrorKind::ExternalServiceFailed => "ExternalServiceFailed",
            ErrorKind::ExternalToolFailed => "ExternalToolFailed",
            ErrorKind::PersistenceFailed => "PersistenceFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::ExternalServiceFailed)
    }

    /// Failures of a collaborator outside this process (backend or tool)
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            ErrorKind::ExternalServiceFailed | ErrorKind::ExternalToolFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
