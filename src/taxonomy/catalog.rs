//! The fixed catalog of error kinds.
//!
//! Every failure the store and registry report is mapped onto one of the
//! [`ErrorCode`]s below. Each code resolves to an immutable [`ErrorKind`]
//! record describing how serious it is, what area it belongs to, whether
//! it can be recovered from, and what the user should try next.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious an error is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the operation and needs immediate attention.
    Critical,
    /// Likely prevents the feature from working.
    High,
    /// Degraded functionality, work can continue.
    Medium,
    /// Informational.
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// Area an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Filesystem,
    Permission,
    Configuration,
    Network,
    Validation,
    State,
    Dependency,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Filesystem => write!(f, "filesystem"),
            Category::Permission => write!(f, "permission"),
            Category::Configuration => write!(f, "configuration"),
            Category::Network => write!(f, "network"),
            Category::Validation => write!(f, "validation"),
            Category::State => write!(f, "state"),
            Category::Dependency => write!(f, "dependency"),
        }
    }
}

/// Identifier of a catalog entry.
///
/// The discriminant order matches [`CATALOG`], which is what makes
/// [`ErrorCode::kind`] a plain index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Filesystem
    NotFound,
    NoDirectory,
    AlreadyExists,
    IsDirectory,
    NotDirectory,
    EmptyDirectory,
    // Permission
    AccessDenied,
    NotPermitted,
    ReadOnlyFs,
    // Configuration
    Config,
    Parse,
    Schema,
    Version,
    // Network
    Network,
    Timeout,
    HostNotFound,
    // Validation
    Invalid,
    Missing,
    Range,
    // State
    State,
    Conflict,
    Locked,
    Migration,
    // Dependency
    Dependency,
    Runtime,
    // Generic
    Unknown,
}

/// Immutable description of one error kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorKind {
    /// Short code such as `ENOENT`.
    pub code: &'static str,
    /// Generic human-readable description.
    pub message: &'static str,
    pub severity: Severity,
    pub category: Category,
    /// Whether the user can plausibly recover without outside help.
    pub recoverable: bool,
    /// What to try next.
    pub suggested_fix: &'static str,
    /// Name of an automated repair action, if one exists.
    pub auto_fix: Option<&'static str>,
}

const fn kind(
    code: &'static str,
    message: &'static str,
    severity: Severity,
    category: Category,
    recoverable: bool,
    suggested_fix: &'static str,
    auto_fix: Option<&'static str>,
) -> ErrorKind {
    ErrorKind {
        code,
        message,
        severity,
        category,
        recoverable,
        suggested_fix,
        auto_fix,
    }
}

use Category as C;
use Severity as S;

/// The catalog, indexed by `ErrorCode as usize`.
pub static CATALOG: [ErrorKind; 26] = [
    kind(
        "ENOENT",
        "File or directory not found",
        S::High,
        C::Filesystem,
        true,
        "Check that the path is correct, or initialise the state directory to create missing files",
        Some("create-missing-file"),
    ),
    kind(
        "ENODIR",
        "Directory does not exist",
        S::High,
        C::Filesystem,
        true,
        "Create the missing directory or initialise the state directory",
        Some("create-directory"),
    ),
    kind(
        "EEXIST",
        "File or directory already exists",
        S::Medium,
        C::Filesystem,
        true,
        "Remove the existing entry or choose a different path",
        None,
    ),
    kind(
        "EISDIR",
        "Expected file but found directory",
        S::High,
        C::Filesystem,
        false,
        "Remove the directory or use the correct file path",
        None,
    ),
    kind(
        "ENOTDIR",
        "Expected directory but found file",
        S::High,
        C::Filesystem,
        false,
        "Remove the file or use the correct directory path",
        None,
    ),
    kind(
        "EEMPTYDIR",
        "Directory is empty",
        S::Medium,
        C::Filesystem,
        true,
        "Populate the directory or initialise it with default content",
        Some("populate-directory"),
    ),
    kind(
        "EACCES",
        "Permission denied",
        S::Critical,
        C::Permission,
        false,
        "Check file and directory permissions. Try \"chmod +rw <path>\" or run with appropriate permissions",
        None,
    ),
    kind(
        "EPERM",
        "Operation not permitted",
        S::Critical,
        C::Permission,
        false,
        "This operation requires elevated privileges or different permissions",
        None,
    ),
    kind(
        "EROFS",
        "Read-only file system",
        S::Critical,
        C::Permission,
        false,
        "Cannot write to a read-only filesystem. Check mount options or disk status",
        None,
    ),
    kind(
        "ECONFIG",
        "Configuration file is invalid or missing",
        S::High,
        C::Configuration,
        true,
        "Check the configuration syntax or delete the file to fall back to defaults",
        Some("recreate-config"),
    ),
    kind(
        "EPARSE",
        "Failed to parse configuration file",
        S::High,
        C::Configuration,
        true,
        "Check JSON/YAML syntax. Common issues: trailing commas, unquoted strings, invalid encoding",
        None,
    ),
    kind(
        "ESCHEMA",
        "Configuration schema validation failed",
        S::Medium,
        C::Configuration,
        true,
        "Review the document against its expected schema",
        Some("validate-config"),
    ),
    kind(
        "EVERSION",
        "Version mismatch or incompatible version",
        S::Medium,
        C::Configuration,
        true,
        "Upgrade to a compatible version",
        Some("update-version"),
    ),
    kind(
        "ENETWORK",
        "Network error or connection failed",
        S::High,
        C::Network,
        true,
        "Check internet connection, firewall settings, or try again later",
        Some("retry-network"),
    ),
    kind(
        "ETIMEOUT",
        "Operation timed out",
        S::High,
        C::Network,
        true,
        "Check network speed and stability. Try increasing the timeout or retrying",
        Some("retry-timeout"),
    ),
    kind(
        "ENOTFOUND",
        "Host or resource not found",
        S::High,
        C::Network,
        true,
        "Check URL/hostname spelling and DNS settings",
        None,
    ),
    kind(
        "EINVAL",
        "Invalid argument or parameter",
        S::Medium,
        C::Validation,
        true,
        "Check input format and required parameters",
        None,
    ),
    kind(
        "EMISSING",
        "Required value is missing",
        S::High,
        C::Validation,
        true,
        "Provide the required value",
        None,
    ),
    kind(
        "ERANGE",
        "Value is out of valid range",
        S::Medium,
        C::Validation,
        true,
        "Provide a value within the valid range",
        None,
    ),
    kind(
        "ESTATE",
        "Invalid application state",
        S::High,
        C::State,
        true,
        "Repair the state directory or clear cached state",
        Some("repair-state"),
    ),
    kind(
        "ECONFLICT",
        "Operation conflicts with current state",
        S::Medium,
        C::State,
        true,
        "Resolve the conflict and retry the operation",
        None,
    ),
    kind(
        "ELOCK",
        "Resource is locked by another process",
        S::Medium,
        C::State,
        true,
        "Wait for the other process to complete or remove the stale lock file",
        Some("remove-lock"),
    ),
    kind(
        "EMIGRATION",
        "Migration required or migration failed",
        S::High,
        C::State,
        true,
        "Run the state migration or repair the state directory",
        Some("run-migration"),
    ),
    kind(
        "EDEP",
        "Missing or incompatible dependency",
        S::Critical,
        C::Dependency,
        true,
        "Install the required dependencies",
        Some("install-deps"),
    ),
    kind(
        "ENODE",
        "Runtime version requirement not met",
        S::Critical,
        C::Dependency,
        false,
        "Upgrade the runtime to a supported version",
        None,
    ),
    kind(
        "EUNKNOWN",
        "An unknown error occurred",
        S::High,
        C::State,
        false,
        "Check logs for more details or report the issue",
        None,
    ),
];

impl ErrorCode {
    /// All codes, in catalog order.
    pub const ALL: [ErrorCode; 26] = [
        ErrorCode::NotFound,
        ErrorCode::NoDirectory,
        ErrorCode::AlreadyExists,
        ErrorCode::IsDirectory,
        ErrorCode::NotDirectory,
        ErrorCode::EmptyDirectory,
        ErrorCode::AccessDenied,
        ErrorCode::NotPermitted,
        ErrorCode::ReadOnlyFs,
        ErrorCode::Config,
        ErrorCode::Parse,
        ErrorCode::Schema,
        ErrorCode::Version,
        ErrorCode::Network,
        ErrorCode::Timeout,
        ErrorCode::HostNotFound,
        ErrorCode::Invalid,
        ErrorCode::Missing,
        ErrorCode::Range,
        ErrorCode::State,
        ErrorCode::Conflict,
        ErrorCode::Locked,
        ErrorCode::Migration,
        ErrorCode::Dependency,
        ErrorCode::Runtime,
        ErrorCode::Unknown,
    ];

    /// The catalog record for this code.
    pub fn kind(self) -> &'static ErrorKind {
        &CATALOG[self as usize]
    }

    /// The short code string, e.g. `"ENOENT"`.
    pub fn as_str(self) -> &'static str {
        self.kind().code
    }

    /// Resolve a short code string. Unknown strings map to [`ErrorCode::Unknown`].
    pub fn from_code(code: &str) -> Self {
        Self::lookup(code).unwrap_or(ErrorCode::Unknown)
    }

    /// Resolve a short code string, returning `None` when it is not in the catalog.
    pub fn lookup(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == code)
    }

    pub fn severity(self) -> Severity {
        self.kind().severity
    }

    pub fn category(self) -> Category {
        self.kind().category
    }

    pub fn is_recoverable(self) -> bool {
        self.kind().recoverable
    }

    /// Whether repeating the same I/O operation could succeed.
    ///
    /// Permission failures never resolve on their own, and content failures
    /// (configuration and validation categories) reproduce on every attempt.
    pub fn is_retryable(self) -> bool {
        !matches!(
            self.category(),
            Category::Permission | Category::Configuration | Category::Validation
        )
    }

    /// Whether this is a permission-category code.
    pub fn is_permission(self) -> bool {
        self.category() == Category::Permission
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(ErrorCode::from_code(&code))
    }
}
