//! Sweeping orphaned temp files.
//!
//! A process killed between writing a temp file and renaming it leaves the
//! temp file behind. The target document is untouched, so these leftovers
//! are pure clutter and safe to remove once they are old enough that no
//! live writer can still own them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::ClassifiedError;
use crate::taxonomy::from_io;

use super::temp::is_temp_file_name;
use super::{FileSystem, OsFileSystem};

/// Temp files younger than this are left alone by default.
pub const DEFAULT_TEMP_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Options for a sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepOptions {
    /// Only files whose modification time is older than this are removed.
    pub max_age: Duration,
    /// Report what would be removed without removing it.
    pub dry_run: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_TEMP_MAX_AGE,
            dry_run: false,
        }
    }
}

/// A file the sweep could not handle.
#[derive(Debug)]
pub struct SweepFailure {
    pub path: PathBuf,
    pub error: ClassifiedError,
}

/// What a sweep did.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Files removed, or that would have been removed on a dry run.
    pub cleaned: Vec<PathBuf>,
    pub errors: Vec<SweepFailure>,
}

impl SweepReport {
    /// True when no file failed.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Removes stale temp files left by interrupted atomic writes.
pub struct TempFileJanitor {
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
}

impl TempFileJanitor {
    pub fn new(fs: Arc<dyn FileSystem>, clock: Arc<dyn Clock>) -> Self {
        Self { fs, clock }
    }

    /// Sweep `dir`.
    ///
    /// A missing directory is an empty, successful sweep. Per-file failures
    /// are collected and never stop the sweep. Only names matching the temp
    /// pattern are ever considered.
    pub fn sweep(&self, dir: &Path, options: SweepOptions) -> SweepReport {
        let mut report = SweepReport::default();

        if !self.fs.exists(dir) {
            return report;
        }

        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                report.errors.push(SweepFailure {
                    path: dir.to_path_buf(),
                    error: from_io(e, format!("Failed to list {}", dir.display())),
                });
                return report;
            }
        };

        let now = SystemTime::from(self.clock.now());

        for path in entries {
            let is_temp = path
                .file_name()
                .map(|name| is_temp_file_name(&name.to_string_lossy()))
                .unwrap_or(false);
            if !is_temp {
                continue;
            }

            let modified = match self.fs.modified(&path) {
                Ok(modified) => modified,
                Err(e) => {
                    let error = from_io(e, format!("Failed to stat {}", path.display()));
                    report.errors.push(SweepFailure { path, error });
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= options.max_age && !options.max_age.is_zero() {
                continue;
            }

            if options.dry_run {
                debug!(path = %path.display(), "would remove stale temp file");
                report.cleaned.push(path);
                continue;
            }

            match self.fs.remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed stale temp file");
                    report.cleaned.push(path);
                }
                Err(e) => {
                    warn!(path = %path.display(), "failed to remove stale temp file: {}", e);
                    let error = from_io(e, format!("Failed to remove {}", path.display()));
                    report.errors.push(SweepFailure { path, error });
                }
            }
        }

        report
    }

    /// Sweep the directory that holds `file`.
    pub fn sweep_for(&self, file: &Path, options: SweepOptions) -> SweepReport {
        match file.parent() {
            Some(dir) => self.sweep(dir, options),
            None => SweepReport::default(),
        }
    }
}

impl Default for TempFileJanitor {
    fn default() -> Self {
        Self::new(Arc::new(OsFileSystem), Arc::new(SystemClock))
    }
}

/// Sweep `dir` on the real filesystem.
pub fn sweep_temp_files(dir: &Path, options: SweepOptions) -> SweepReport {
    TempFileJanitor::default().sweep(dir, options)
}

/// Sweep the directory holding `file` on the real filesystem.
pub fn sweep_temp_files_for(file: &Path, options: SweepOptions) -> SweepReport {
    TempFileJanitor::default().sweep_for(file, options)
}
