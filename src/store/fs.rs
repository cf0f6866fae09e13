//! Filesystem seam used by the store, janitor, and audit log.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// The filesystem operations statekeep needs.
///
/// This trait allows injecting failures in tests.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Create or truncate `path` and write `contents`.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Append `contents` to `path`, creating it if needed.
    fn append(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Paths of the entries directly inside `dir`.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Permission bits of `path`.
    fn mode(&self, path: &Path) -> io::Result<u32>;

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }

    fn append(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    #[cfg(unix)]
    fn mode(&self, path: &Path) -> io::Result<u32> {
        use std::os::unix::fs::PermissionsExt;
        Ok(fs::metadata(path)?.permissions().mode() & 0o777)
    }

    #[cfg(not(unix))]
    fn mode(&self, _path: &Path) -> io::Result<u32> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "permission bits are unix-only",
        ))
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        Ok(())
    }
}

/// Operations a [`FlakyFileSystem`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    Read,
    Write,
    Append,
    Rename,
    Remove,
    CreateDir,
    ReadDir,
    Modified,
    SetMode,
}

type ErrorFactory = Arc<dyn Fn() -> io::Error + Send + Sync>;

struct Plan {
    remaining: usize,
    make_error: ErrorFactory,
}

/// A filesystem that fails chosen operations a set number of times.
///
/// Every call is counted per [`FsOp`], whether it failed or not.
///
/// ```
/// use std::io;
/// use statekeep::store::{FileSystem, FlakyFileSystem, FsOp};
///
/// let fs = FlakyFileSystem::default()
///     .fail(FsOp::Read, 1, || io::Error::new(io::ErrorKind::Interrupted, "flaky"));
/// assert!(fs.read_to_string("/definitely/missing".as_ref()).is_err());
/// assert_eq!(fs.calls(FsOp::Read), 1);
/// ```
pub struct FlakyFileSystem<F: FileSystem = OsFileSystem> {
    inner: F,
    plans: Mutex<HashMap<FsOp, Plan>>,
    calls: Mutex<HashMap<FsOp, usize>>,
}

impl Default for FlakyFileSystem<OsFileSystem> {
    fn default() -> Self {
        Self::new(OsFileSystem)
    }
}

impl<F: FileSystem> FlakyFileSystem<F> {
    /// Wrap another filesystem.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            plans: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Fail the next `times` calls of `op` with the error `make_error` builds.
    pub fn fail(
        self,
        op: FsOp,
        times: usize,
        make_error: impl Fn() -> io::Error + Send + Sync + 'static,
    ) -> Self {
        if let Ok(mut plans) = self.plans.lock() {
            plans.insert(
                op,
                Plan {
                    remaining: times,
                    make_error: Arc::new(make_error),
                },
            );
        }
        self
    }

    /// Number of times `op` was called.
    pub fn calls(&self, op: FsOp) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn check(&self, op: FsOp) -> io::Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(op).or_insert(0) += 1;
        }

        let mut plans = match self.plans.lock() {
            Ok(plans) => plans,
            Err(_) => return Ok(()),
        };
        match plans.get_mut(&op) {
            Some(plan) if plan.remaining > 0 => {
                plan.remaining -= 1;
                Err((plan.make_error)())
            }
            _ => Ok(()),
        }
    }
}

impl<F: FileSystem> FileSystem for FlakyFileSystem<F> {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.check(FsOp::Read)?;
        self.inner.read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.check(FsOp::Write)?;
        self.inner.write(path, contents)
    }

    fn append(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.check(FsOp::Append)?;
        self.inner.append(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check(FsOp::Rename)?;
        self.inner.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.check(FsOp::Remove)?;
        self.inner.remove_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.check(FsOp::CreateDir)?;
        self.inner.create_dir_all(path)
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.check(FsOp::ReadDir)?;
        self.inner.read_dir(dir)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.check(FsOp::Modified)?;
        self.inner.modified(path)
    }

    fn mode(&self, path: &Path) -> io::Result<u32> {
        self.inner.mode(path)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.check(FsOp::SetMode)?;
        self.inner.set_mode(path, mode)
    }
}

impl<F: FileSystem> std::fmt::Debug for FlakyFileSystem<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlakyFileSystem").finish_non_exhaustive()
    }
}
