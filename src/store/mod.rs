//! Atomic JSON document storage.
//!
//! This module provides [`JsonFile`], which reads and writes one JSON
//! document with atomic replacement, bounded retries and optional schema
//! validation, plus the [`TempFileJanitor`] that clears temp files left by
//! interrupted writes.

mod document;
mod fs;
pub mod janitor;
mod options;
pub mod permissions;
mod retry;
mod temp;

pub use document::JsonFile;
pub use fs::{FileSystem, FlakyFileSystem, FsOp, OsFileSystem};
pub use janitor::{
    sweep_temp_files, sweep_temp_files_for, SweepFailure, SweepOptions, SweepReport,
    TempFileJanitor, DEFAULT_TEMP_MAX_AGE,
};
pub use options::{StoreOptions, Validator};
pub use permissions::{check_file_permissions, set_secure_permissions, PermissionCheck, SECURE_MODE};
pub use retry::RetryPolicy;
pub use temp::is_temp_file_name;
