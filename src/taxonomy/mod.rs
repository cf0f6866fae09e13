//! Error taxonomy: catalog, classifier, and formatter.
//!
//! - [`ErrorCode`] / [`ErrorKind`] - the fixed catalog, loaded once
//! - [`classify`] - maps native failures onto the catalog
//! - [`format_error`] - renders `[CODE] message` with remediation hints
//!
//! # Example
//!
//! ```
//! use statekeep::taxonomy::{classify, ErrorCode};
//!
//! let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
//! let code = classify(&err);
//! assert_eq!(code, ErrorCode::AccessDenied);
//! assert!(!code.is_retryable());
//! ```

mod catalog;
mod classify;
mod format;

pub use catalog::{Category, ErrorCode, ErrorKind, Severity, CATALOG};
pub use classify::{
    auto_fix, classify, classify_anyhow, classify_io, classify_message, create_typed,
    is_recoverable, suggested_fix,
};
pub use format::{format_error, FormatOptions};

pub(crate) use classify::from_io;
