//! Append-only audit trail of registry mutations (JSONL).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::store::FileSystem;

/// File name of the audit log inside the sessions directory.
pub const AUDIT_LOG_FILE: &str = "audit.log";

/// The mutation an audit line records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Register,
    Unregister,
    Update,
    Save,
    Batch,
    Cleanup,
}

/// Writes one JSON object per line when enabled.
///
/// Failures never reach the caller; they are logged and dropped.
pub(crate) struct AuditLog {
    path: PathBuf,
    enabled: bool,
    fs: Arc<dyn FileSystem>,
}

impl AuditLog {
    pub(crate) fn new(sessions_dir: &Path, enabled: bool, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: sessions_dir.join(AUDIT_LOG_FILE),
            enabled,
            fs,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn set_filesystem(&mut self, fs: Arc<dyn FileSystem>) {
        self.fs = fs;
    }

    /// Append `{timestamp, action, ...details}`.
    pub(crate) fn record(&self, now: DateTime<Utc>, action: AuditAction, details: Value) {
        if !self.enabled {
            return;
        }

        let mut entry = Map::new();
        entry.insert("timestamp".to_string(), Value::String(now.to_rfc3339()));
        entry.insert(
            "action".to_string(),
            serde_json::to_value(action).unwrap_or(Value::Null),
        );
        if let Value::Object(details) = details {
            entry.extend(details);
        }

        let mut line = match serde_json::to_vec(&Value::Object(entry)) {
            Ok(line) => line,
            Err(e) => {
                warn!("could not encode audit entry: {}", e);
                return;
            }
        };
        line.push(b'\n');

        if let Err(e) = self.fs.append(&self.path, &line) {
            warn!(path = %self.path.display(), "audit log write failed: {}", e);
        }
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("path", &self.path)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FlakyFileSystem, FsOp, OsFileSystem};
    use serde_json::json;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        "2025-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn disabled_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::new(temp.path(), false, Arc::new(OsFileSystem));
        log.record(now(), AuditAction::Save, json!({"session_count": 0}));
        assert!(!log.path().exists());
    }

    #[test]
    fn appends_json_lines() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::new(temp.path(), true, Arc::new(OsFileSystem));

        log.record(now(), AuditAction::Register, json!({"session_id": "1"}));
        log.record(now(), AuditAction::Cleanup, json!({"session_id": "2"}));

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["action"], "register");
        assert_eq!(lines[0]["session_id"], "1");
        assert_eq!(lines[1]["action"], "cleanup");
        assert!(lines[1]["timestamp"].as_str().unwrap().starts_with("2025-01-01"));
    }

    #[test]
    fn failures_are_swallowed() {
        let temp = TempDir::new().unwrap();
        let fs = Arc::new(FlakyFileSystem::default().fail(FsOp::Append, 1, || {
            std::io::Error::new(std::io::ErrorKind::Other, "disk full")
        }));
        let log = AuditLog::new(temp.path(), true, fs.clone());

        log.record(now(), AuditAction::Save, json!({}));
        assert_eq!(fs.calls(FsOp::Append), 1);
        assert!(!log.path().exists());
    }
}
