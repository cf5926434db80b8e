//! # codelearn-error
//!
//! Unified error handling for codelearn.
//!
//! ## Design
//!
//! - **ErrorKind**: what went wrong (e.g. FileNotFound, ExternalServiceFailed)
//! - **ErrorStatus**: whether a retry can help (Permanent, Temporary, Persistent)
//! - **Error context**: operation name plus key-value pairs for locating the cause
//! - **Error source**: the underlying error, wrapped without leaking its type
//!
//! ## Usage
//!
//! ```rust
//! use codelearn_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::FileNotFound, "source file 'foo.py' not found")
//!         .with_operation("source::read")
//!         .with_context("path", "foo.py"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, codelearn_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - An error is handled once; callers further up only append context
//! - IO errors are classified where the path is known, not through `From`

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the codelearn Error
pub type Result<T> = std::result::Result<T, Error>;
