//! A single JSON document on disk.
//!
//! [`JsonFile`] owns one absolute path. Writes go to a unique temp sibling
//! and are renamed over the target, so a reader sees either the previous
//! document or the new one and never a partial write.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{ClassifiedError, Result};
use crate::taxonomy::{classify_io, classify_message, ErrorCode};

use super::permissions::{check_file_permissions, set_secure_permissions};
use super::temp::{random_suffix, temp_path_for};
use super::{FileSystem, OsFileSystem, StoreOptions};

/// Atomic, retrying access to one JSON document.
///
/// `T` is the document type; ad-hoc callers use the default
/// [`serde_json::Value`].
///
/// ```no_run
/// use serde_json::json;
/// use statekeep::store::{JsonFile, StoreOptions};
///
/// let file = JsonFile::new(
///     "/tmp/counter.json",
///     StoreOptions::default().with_default(json!({"count": 0})),
/// )?;
/// let updated = file.modify(|mut doc| {
///     doc["count"] = json!(doc["count"].as_i64().unwrap_or(0) + 1);
///     Ok(doc)
/// })?;
/// assert!(updated["count"].as_i64().is_some());
/// # Ok::<(), statekeep::ClassifiedError>(())
/// ```
pub struct JsonFile<T = Value> {
    path: PathBuf,
    options: StoreOptions<T>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Create a handle for `path`, which must be absolute.
    pub fn new(path: impl Into<PathBuf>, options: StoreOptions<T>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ClassifiedError::new(ErrorCode::Invalid, "path is required"));
        }
        if !path.is_absolute() {
            return Err(
                ClassifiedError::new(ErrorCode::Invalid, "path must be an absolute path")
                    .with_context("provided", path.display().to_string()),
            );
        }

        debug!(
            path = %path.display(),
            retries = options.retries,
            backoff_ms = options.backoff.as_millis() as u64,
            "opened json file"
        );

        Ok(Self {
            path,
            options,
            fs: Arc::new(OsFileSystem),
            clock: Arc::new(SystemClock),
        })
    }

    /// Use a different filesystem.
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Use a different clock for temp names and backoff waits.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &StoreOptions<T> {
        &self.options
    }

    pub fn exists(&self) -> bool {
        self.fs.exists(&self.path)
    }

    /// Read the document, retrying transient failures.
    ///
    /// A missing file yields the default value when one is configured and
    /// `ENOENT` otherwise. Parse, schema and permission failures are
    /// returned at once.
    pub fn read(&self) -> Result<T> {
        if let Some(missing) = self.missing() {
            return missing;
        }
        self.options
            .retry_policy()
            .run(self.clock.as_ref(), "read", &self.path, |attempt| {
                debug!(path = %self.path.display(), attempt, "read");
                self.read_attempt()
            })
    }

    /// Read the document in a single attempt.
    pub fn read_once(&self) -> Result<T> {
        if let Some(missing) = self.missing() {
            return missing;
        }
        self.read_attempt()
    }

    /// Validate and atomically write `data`, retrying transient failures.
    ///
    /// Validation runs before any I/O. Permission failures are not retried.
    /// In secure mode the 0600 mode is set on the temp file before the
    /// rename, so the target is never visible with wider permissions.
    pub fn write(&self, data: &T) -> Result<()> {
        let content = self.prepare(data)?;
        self.options
            .retry_policy()
            .run(self.clock.as_ref(), "write", &self.path, |attempt| {
                debug!(path = %self.path.display(), attempt, "write");
                self.write_attempt(&content)
            })
    }

    /// Validate and atomically write `data` in a single attempt.
    pub fn write_once(&self, data: &T) -> Result<()> {
        let content = self.prepare(data)?;
        self.write_attempt(&content)
    }

    /// Read, transform and write back.
    ///
    /// A missing file with a configured default hands the default to
    /// `modifier`. A failing modifier is reported as `EINVAL` and nothing is
    /// written.
    pub fn modify<F>(&self, modifier: F) -> Result<T>
    where
        F: FnOnce(T) -> anyhow::Result<T>,
    {
        debug!(path = %self.path.display(), "modify");

        let current = match self.read() {
            Ok(data) => data,
            Err(err) if err.code() == ErrorCode::NotFound => match &self.options.default_value {
                Some(default) => default.clone(),
                None => return Err(err),
            },
            Err(err) => return Err(err),
        };

        let updated = modifier(current).map_err(|e| {
            ClassifiedError::new(
                ErrorCode::Invalid,
                format!("Modifier function failed: {}", e),
            )
            .with_context("path", self.path.display().to_string())
            .with_cause(e)
        })?;

        self.write(&updated)?;
        Ok(updated)
    }

    /// Remove the file. Removing a missing file succeeds.
    pub fn delete(&self) -> Result<()> {
        if !self.fs.exists(&self.path) {
            return Ok(());
        }
        match self.fs.remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_failure(e, Action::Delete)),
        }
    }

    fn missing(&self) -> Option<Result<T>> {
        if self.fs.exists(&self.path) {
            return None;
        }
        Some(match &self.options.default_value {
            Some(default) => {
                debug!(path = %self.path.display(), "using default value");
                Ok(default.clone())
            }
            None => Err(ClassifiedError::new(
                ErrorCode::NotFound,
                format!("File not found: {}", self.path.display()),
            )
            .with_context("path", self.path.display().to_string())),
        })
    }

    fn read_attempt(&self) -> Result<T> {
        let content = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| self.io_failure(e, Action::Read))?;

        let data: T = serde_json::from_str(&content).map_err(|e| {
            let code = if e.is_data() {
                ErrorCode::Schema
            } else {
                ErrorCode::Parse
            };
            ClassifiedError::new(
                code,
                format!("Invalid JSON in {}: {}", self.path.display(), e),
            )
            .with_context("path", self.path.display().to_string())
            .with_cause(e)
        })?;

        if let Some(validator) = &self.options.validator {
            validator(&data).map_err(|e| {
                ClassifiedError::new(
                    ErrorCode::Schema,
                    format!("Schema validation failed for {}: {}", self.path.display(), e),
                )
                .with_context("path", self.path.display().to_string())
                .with_cause(e)
            })?;
        }

        if self.options.warn_insecure {
            self.warn_if_insecure();
        }

        Ok(data)
    }

    fn warn_if_insecure(&self) {
        if let Ok(mode) = self.fs.mode(&self.path) {
            let check = check_file_permissions(mode);
            if let Some(warning) = check.warning {
                warn!(path = %self.path.display(), "Security Warning: {}", warning);
            }
        }
    }

    /// Validate and serialize ahead of any I/O.
    fn prepare(&self, data: &T) -> Result<Vec<u8>> {
        if let Some(validator) = &self.options.validator {
            validator(data).map_err(|e| {
                ClassifiedError::new(
                    ErrorCode::Schema,
                    format!("Schema validation failed: {}", e),
                )
                .with_context("path", self.path.display().to_string())
                .with_cause(e)
            })?;
        }

        let mut content = serialize(data, self.options.indent).map_err(|e| {
            ClassifiedError::new(
                ErrorCode::Invalid,
                format!("Cannot serialize data for {}: {}", self.path.display(), e),
            )
            .with_context("path", self.path.display().to_string())
            .with_cause(e)
        })?;
        content.push(b'\n');
        Ok(content)
    }

    fn write_attempt(&self, content: &[u8]) -> Result<()> {
        if self.options.create_dir {
            if let Some(dir) = self.path.parent() {
                if !self.fs.exists(dir) {
                    self.fs
                        .create_dir_all(dir)
                        .map_err(|e| self.io_failure(e, Action::Write))?;
                    debug!(dir = %dir.display(), "created directory");
                }
            }
        }

        let temp = temp_path_for(
            &self.path,
            self.clock.now().timestamp_millis(),
            &random_suffix(),
        );

        let result = self.fs.write(&temp, content).and_then(|()| {
            if self.options.secure_mode {
                if let Err(e) = set_secure_permissions(self.fs.as_ref(), &temp) {
                    warn!(path = %self.path.display(), "could not restrict permissions: {}", e);
                }
            }
            self.fs.rename(&temp, &self.path)
        });

        if let Err(e) = result {
            if self.fs.exists(&temp) {
                let _ = self.fs.remove_file(&temp);
            }
            return Err(self.io_failure(e, Action::Write));
        }

        debug!(path = %self.path.display(), "write complete");
        Ok(())
    }

    /// Classify an I/O failure for `action`.
    ///
    /// Read permission failures all report `EACCES`; write and delete keep
    /// the specific permission code.
    fn io_failure(&self, err: io::Error, action: Action) -> ClassifiedError {
        let code = classify_io(&err).unwrap_or_else(|| classify_message(&err.to_string()));
        let path = self.path.display();

        let (code, message) = match action {
            Action::Read if code.is_permission() => (
                ErrorCode::AccessDenied,
                format!("Permission denied reading {}", path),
            ),
            Action::Write if code.is_permission() => {
                (code, format!("Permission denied writing {}", path))
            }
            _ => (code, format!("Failed to {} {}: {}", action.verb(), path, err)),
        };

        ClassifiedError::new(code, message)
            .with_context("path", path.to_string())
            .with_cause(err)
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Read,
    Write,
    Delete,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
        }
    }
}

fn serialize<T: Serialize>(data: &T, indent: usize) -> serde_json::Result<Vec<u8>> {
    if indent == 0 {
        return serde_json::to_vec(data);
    }
    let indent = vec![b' '; indent];
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
    data.serialize(&mut serializer)?;
    Ok(out)
}

impl<T> fmt::Debug for JsonFile<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFile")
            .field("path", &self.path)
            .field("retries", &self.options.retries)
            .field("backoff", &self.options.backoff)
            .finish_non_exhaustive()
    }
}
