//! The session registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{ClassifiedError, Result};
use crate::store::{FileSystem, JsonFile, OsFileSystem, StoreOptions};
use crate::taxonomy::{from_io, ErrorCode};

use super::audit::{AuditAction, AuditLog};
use super::batch::{BatchOp, BatchQueue};
use super::cache::{RegistryCache, DEFAULT_CACHE_TTL};
use super::document::{strip_timestamps, Fields, RegistryDocument, SessionCounts, SessionRecord};
use super::events::{ListenerId, Listeners, RegistryEvent};

/// File name of the registry inside the sessions directory.
pub const REGISTRY_FILE: &str = "registry.json";

/// Where the sessions directory lives under a project root by default.
pub fn default_sessions_dir(project_root: &Path) -> PathBuf {
    project_root.join(".statekeep").join("sessions")
}

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Overrides [`default_sessions_dir`].
    pub sessions_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
    /// Append every mutation to `audit.log`.
    pub audit_log: bool,
    pub store: StoreOptions<RegistryDocument>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            sessions_dir: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            audit_log: false,
            store: StoreOptions::default(),
        }
    }
}

/// A keyed collection of session records stored in one JSON document.
///
/// Every mutation re-reads the file, changes it in memory and writes the
/// whole document back atomically. Listeners registered with
/// [`subscribe`](Self::subscribe) are called on the caller's thread right
/// after each change, in call order.
pub struct SessionRegistry {
    project_root: PathBuf,
    sessions_dir: PathBuf,
    file: JsonFile<RegistryDocument>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    cache: RegistryCache,
    batch: BatchQueue,
    listeners: Listeners,
    audit: AuditLog,
    last_load_error: Option<ClassifiedError>,
}

impl SessionRegistry {
    /// Open the registry for `project_root`.
    ///
    /// Nothing is read or created until the first operation.
    pub fn new(project_root: impl Into<PathBuf>, options: RegistryOptions) -> Result<Self> {
        let project_root = project_root.into();
        let project_root = std::path::absolute(&project_root).map_err(|e| {
            from_io(e, format!("Cannot resolve {}", project_root.display()))
        })?;
        let sessions_dir = options
            .sessions_dir
            .clone()
            .unwrap_or_else(|| default_sessions_dir(&project_root));
        let fs: Arc<dyn FileSystem> = Arc::new(OsFileSystem);

        let file = JsonFile::new(sessions_dir.join(REGISTRY_FILE), options.store)?;
        let audit = AuditLog::new(&sessions_dir, options.audit_log, fs.clone());

        debug!(path = %file.path().display(), "opened session registry");

        Ok(Self {
            project_root,
            sessions_dir,
            file,
            fs,
            clock: Arc::new(SystemClock),
            cache: RegistryCache::new(options.cache_ttl),
            batch: BatchQueue::default(),
            listeners: Listeners::default(),
            audit,
            last_load_error: None,
        })
    }

    /// Use a different filesystem for the registry, its directory and the audit log.
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.file = self.file.with_filesystem(fs.clone());
        self.audit.set_filesystem(fs.clone());
        self.fs = fs;
        self
    }

    /// Use a different clock for timestamps, cache ageing and backoff.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.file = self.file.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    pub fn registry_path(&self) -> &Path {
        self.file.path()
    }

    pub fn audit_log_path(&self) -> &Path {
        self.audit.path()
    }

    /// Register a listener for every subsequent event.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&RegistryEvent) + Send + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Load the registry, never failing.
    ///
    /// Returns the cached copy when it is younger than the TTL and `force`
    /// is false. An unreadable file degrades to an empty registry; the
    /// failure is logged and kept in [`last_load_error`](Self::last_load_error).
    pub fn load(&mut self, force: bool) -> RegistryDocument {
        match self.load_strict(force) {
            Ok(registry) => registry,
            Err(err) => {
                warn!(
                    path = %self.file.path().display(),
                    code = %err.code(),
                    "registry unreadable, using an empty registry: {}",
                    err
                );
                let registry = self.empty_registry();
                self.cache.put(registry.clone(), self.clock.now());
                self.last_load_error = Some(err);
                registry
            }
        }
    }

    /// Load the registry, propagating read failures.
    ///
    /// A missing file is not a failure and yields an empty registry. Every
    /// mutation loads this way so a damaged file is never overwritten.
    pub fn load_strict(&mut self, force: bool) -> Result<RegistryDocument> {
        if !force {
            if let Some(cached) = self.cache.get(self.clock.now()) {
                return Ok(cached.clone());
            }
        }

        self.ensure_dir()?;
        let registry = match self.file.read() {
            Ok(registry) => registry,
            Err(err) if err.code() == ErrorCode::NotFound => self.empty_registry(),
            Err(err) => return Err(err),
        };

        self.cache.put(registry.clone(), self.clock.now());
        self.last_load_error = None;
        self.listeners.emit(&RegistryEvent::Loaded {
            session_count: registry.sessions.len(),
        });
        Ok(registry)
    }

    /// Single-attempt load. Bypasses the cache and emits no events.
    pub fn load_once(&mut self) -> RegistryDocument {
        if let Err(err) = self.ensure_dir() {
            warn!("could not create {}: {}", self.sessions_dir.display(), err);
        }

        let registry = match self.file.read_once() {
            Ok(registry) => registry,
            Err(err) if err.code() == ErrorCode::NotFound => self.empty_registry(),
            Err(err) => {
                warn!(
                    path = %self.file.path().display(),
                    "registry unreadable, using an empty registry: {}",
                    err
                );
                self.last_load_error = Some(err);
                return self.empty_registry();
            }
        };

        self.cache.put(registry.clone(), self.clock.now());
        self.last_load_error = None;
        registry
    }

    /// Stamp `updated`, write, and refresh the cache.
    pub fn save(&mut self, registry: &mut RegistryDocument) -> Result<()> {
        registry.updated = self.clock.now();
        self.file.write(registry)?;

        let session_count = registry.sessions.len();
        self.cache.put(registry.clone(), self.clock.now());
        self.audit.record(
            self.clock.now(),
            AuditAction::Save,
            json!({ "session_count": session_count }),
        );
        self.listeners
            .emit(&RegistryEvent::Saved { session_count });
        Ok(())
    }

    /// Single-attempt save. Emits no events and writes no audit line.
    pub fn save_once(&mut self, registry: &mut RegistryDocument) -> Result<()> {
        registry.updated = self.clock.now();
        self.file.write_once(registry)?;
        self.cache.put(registry.clone(), self.clock.now());
        Ok(())
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// The failure behind the last degraded [`load`](Self::load), cleared by
    /// the next successful one.
    pub fn last_load_error(&self) -> Option<&ClassifiedError> {
        self.last_load_error.as_ref()
    }

    pub fn get_session(&mut self, session_id: &str) -> Option<SessionRecord> {
        self.load(false).sessions.remove(session_id)
    }

    pub fn get_all_sessions(&mut self) -> BTreeMap<String, SessionRecord> {
        self.load(false).sessions
    }

    /// The next unused numeric id.
    pub fn get_next_id(&mut self) -> u64 {
        self.load(false).next_id.max(1)
    }

    pub fn count_sessions(&mut self) -> SessionCounts {
        self.load(false).counts()
    }

    /// Insert or replace `session_id` with `data`.
    pub fn register_session(&mut self, session_id: &str, data: Fields) -> Result<()> {
        let mut registry = self.load_strict(true)?;
        registry.insert_session(session_id, data.clone(), self.clock.now());
        self.save(&mut registry)?;

        self.audit.record(
            self.clock.now(),
            AuditAction::Register,
            json!({ "session_id": session_id, "session_data": data }),
        );
        if let Some(session) = registry.sessions.remove(session_id) {
            self.listeners.emit(&RegistryEvent::Registered {
                session_id: session_id.to_string(),
                session,
            });
        }
        Ok(())
    }

    /// Remove `session_id`. Returns whether it was registered.
    pub fn unregister_session(&mut self, session_id: &str) -> Result<bool> {
        let mut registry = self.load_strict(true)?;
        if !registry.remove_session(session_id) {
            return Ok(false);
        }
        self.save(&mut registry)?;

        self.audit.record(
            self.clock.now(),
            AuditAction::Unregister,
            json!({ "session_id": session_id }),
        );
        self.listeners.emit(&RegistryEvent::Unregistered {
            session_id: session_id.to_string(),
        });
        Ok(true)
    }

    /// Shallow-merge `updates` into `session_id`.
    ///
    /// Returns `Ok(false)` when the session is not registered; nothing is
    /// written in that case. `registered_at`/`updated_at` keys are ignored
    /// and do not appear in the `Updated` event.
    pub fn update_session(&mut self, session_id: &str, mut updates: Fields) -> Result<bool> {
        strip_timestamps(&mut updates);
        let mut registry = self.load_strict(true)?;
        if !registry.merge_session(session_id, &updates, self.clock.now()) {
            debug!(session_id, "update skipped, session not found");
            return Ok(false);
        }
        self.save(&mut registry)?;

        self.audit.record(
            self.clock.now(),
            AuditAction::Update,
            json!({ "session_id": session_id, "updates": updates }),
        );
        self.listeners.emit(&RegistryEvent::Updated {
            session_id: session_id.to_string(),
            changes: updates,
        });
        Ok(true)
    }

    /// Start queueing mutations. Anything already queued is dropped.
    pub fn start_batch(&mut self) {
        self.batch.start();
    }

    /// Queue `op` without touching disk. Fails with `ESTATE` outside a batch.
    pub fn add_to_batch(&mut self, op: BatchOp) -> Result<()> {
        self.batch.push(op)
    }

    /// Apply every queued op in order and save once.
    ///
    /// Returns how many ops changed the registry. Registers always count;
    /// unregisters and updates of unknown sessions do not. Batch mode ends
    /// whether or not the commit succeeds. Fails with `ESTATE` outside a
    /// batch.
    pub fn commit_batch(&mut self) -> Result<usize> {
        let ops = self.batch.take()?;
        let mut registry = self.load_strict(true)?;

        let now = self.clock.now();
        let applied = ops.iter().filter(|op| op.apply(&mut registry, now)).count();

        self.save(&mut registry)
            .map_err(|err| err.with_context("applied", applied))?;

        self.audit.record(
            self.clock.now(),
            AuditAction::Batch,
            json!({ "applied": applied }),
        );
        debug!(queued = ops.len(), applied, "batch committed");
        Ok(applied)
    }

    /// Leave batch mode and drop the queue without saving.
    pub fn cancel_batch(&mut self) {
        self.batch.cancel();
    }

    pub fn is_batching(&self) -> bool {
        self.batch.is_active()
    }

    pub fn pending_batch_ops(&self) -> usize {
        self.batch.len()
    }

    /// Remove every session `is_alive` rejects, saving once.
    ///
    /// Returns the number removed. One `Unregistered` event per removal
    /// fires after the save succeeds.
    pub fn cleanup_stale_sessions<F>(&mut self, mut is_alive: F) -> Result<usize>
    where
        F: FnMut(&str, &SessionRecord) -> bool,
    {
        let mut registry = self.load_strict(true)?;

        let stale: Vec<String> = registry
            .sessions
            .iter()
            .filter(|(id, session)| !is_alive(id.as_str(), *session))
            .map(|(id, _)| id.clone())
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }

        for id in &stale {
            registry.remove_session(id);
        }
        self.save(&mut registry)?;

        for id in &stale {
            self.audit.record(
                self.clock.now(),
                AuditAction::Cleanup,
                json!({ "session_id": id }),
            );
            self.listeners.emit(&RegistryEvent::Unregistered {
                session_id: id.clone(),
            });
        }
        debug!(cleaned = stale.len(), "stale sessions removed");
        Ok(stale.len())
    }

    fn ensure_dir(&self) -> Result<()> {
        if self.fs.exists(&self.sessions_dir) {
            return Ok(());
        }
        self.fs.create_dir_all(&self.sessions_dir).map_err(|e| {
            from_io(
                e,
                format!("Failed to create {}", self.sessions_dir.display()),
            )
            .with_context("path", self.sessions_dir.display().to_string())
        })
    }

    fn empty_registry(&self) -> RegistryDocument {
        let project_name = self
            .project_root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        RegistryDocument::empty(project_name, self.clock.now())
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("path", &self.file.path())
            .field("batching", &self.batch.is_active())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{FlakyFileSystem, FsOp};
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    fn registry_in(temp: &TempDir) -> SessionRegistry {
        SessionRegistry::new(temp.path().join("my-project"), RegistryOptions::default()).unwrap()
    }

    fn record_events(registry: &mut SessionRegistry) -> Arc<Mutex<Vec<RegistryEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        registry.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        events
    }

    fn names(events: &Arc<Mutex<Vec<RegistryEvent>>>) -> Vec<&'static str> {
        events.lock().unwrap().iter().map(|e| e.name()).collect()
    }

    #[test]
    fn default_paths() {
        let temp = TempDir::new().unwrap();
        let registry = registry_in(&temp);
        assert_eq!(
            registry.registry_path(),
            temp.path().join("my-project/.statekeep/sessions/registry.json")
        );
        assert!(registry.audit_log_path().ends_with("audit.log"));
    }

    #[test]
    fn sessions_dir_override() {
        let temp = TempDir::new().unwrap();
        let registry = SessionRegistry::new(
            temp.path(),
            RegistryOptions {
                sessions_dir: Some(temp.path().join("custom")),
                ..RegistryOptions::default()
            },
        )
        .unwrap();
        assert_eq!(registry.registry_path(), temp.path().join("custom/registry.json"));
    }

    #[test]
    fn load_missing_gives_default_and_creates_dir() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        let events = record_events(&mut registry);

        let doc = registry.load(false);
        assert_eq!(doc.schema_version, "1.0.0");
        assert_eq!(doc.next_id, 1);
        assert_eq!(doc.project_name, "my-project");
        assert!(doc.sessions.is_empty());
        assert!(registry.sessions_dir().exists());
        assert_eq!(names(&events), vec!["loaded"]);
        assert!(registry.last_load_error().is_none());
    }

    #[test]
    fn load_uses_cache_until_forced() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        let events = record_events(&mut registry);

        registry.load(false);
        registry.load(false);
        assert_eq!(names(&events), vec!["loaded"]);

        registry.load(true);
        assert_eq!(names(&events), vec!["loaded", "loaded"]);
    }

    #[test]
    fn cache_expires_with_clock() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::default());
        let mut registry = registry_in(&temp).with_clock(clock.clone());
        let events = record_events(&mut registry);

        registry.load(false);
        clock.advance(Duration::from_secs(11));
        registry.load(false);
        assert_eq!(names(&events), vec!["loaded", "loaded"]);
    }

    #[test]
    fn clear_cache_forces_reload() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        let events = record_events(&mut registry);

        registry.load(false);
        registry.clear_cache();
        registry.load(false);
        assert_eq!(names(&events), vec!["loaded", "loaded"]);
    }

    #[test]
    fn corrupt_file_degrades_load_but_blocks_mutation() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        std::fs::create_dir_all(registry.sessions_dir()).unwrap();
        std::fs::write(registry.registry_path(), "{ not json").unwrap();

        let doc = registry.load(false);
        assert!(doc.sessions.is_empty());
        assert_eq!(
            registry.last_load_error().map(|e| e.code()),
            Some(ErrorCode::Parse)
        );

        let err = registry.register_session("1", Fields::new()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Parse);
        assert_eq!(
            std::fs::read_to_string(registry.registry_path()).unwrap(),
            "{ not json"
        );
    }

    #[test]
    fn register_persists_and_emits() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        let events = record_events(&mut registry);

        registry
            .register_session("1", fields(json!({"worktree": "/tmp/wt", "status": "active"})))
            .unwrap();

        assert_eq!(names(&events), vec!["loaded", "saved", "registered"]);
        let session = registry.get_session("1").unwrap();
        assert_eq!(session.get("worktree"), Some(&json!("/tmp/wt")));
        assert!(session.registered_at.is_some());

        let on_disk: Value =
            serde_json::from_str(&std::fs::read_to_string(registry.registry_path()).unwrap())
                .unwrap();
        assert_eq!(on_disk["sessions"]["1"]["worktree"], "/tmp/wt");
        assert_eq!(on_disk["next_id"], 2);
    }

    #[test]
    fn register_five_advances_next_id() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        registry.register_session("5", Fields::new()).unwrap();
        assert_eq!(registry.get_next_id(), 6);
    }

    #[test]
    fn unregister_reports_found() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        registry.register_session("1", Fields::new()).unwrap();
        let events = record_events(&mut registry);

        assert!(registry.unregister_session("1").unwrap());
        assert!(!registry.unregister_session("1").unwrap());
        assert!(registry.get_session("1").is_none());
        assert_eq!(
            events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.name() == "unregistered")
                .count(),
            1
        );
    }

    #[test]
    fn update_merges_or_reports_missing() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        registry
            .register_session("1", fields(json!({"status": "active", "branch": "main"})))
            .unwrap();
        let events = record_events(&mut registry);

        assert!(registry
            .update_session("1", fields(json!({"status": "stopped"})))
            .unwrap());
        assert!(!registry
            .update_session("99", fields(json!({"status": "stopped"})))
            .unwrap());

        let session = registry.get_session("1").unwrap();
        assert_eq!(session.status(), Some("stopped"));
        assert_eq!(session.get("branch"), Some(&json!("main")));
        assert!(session.updated_at.is_some());

        let updated: Vec<_> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                RegistryEvent::Updated { session_id, changes } => {
                    Some((session_id.clone(), changes.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(updated, vec![("1".to_string(), fields(json!({"status": "stopped"})))]);
    }

    #[test]
    fn caller_timestamps_keep_registry_readable() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        registry
            .register_session("1", fields(json!({"registered_at": "2024-01-01T00:00:00Z"})))
            .unwrap();
        let events = record_events(&mut registry);

        registry.register_session("2", Fields::new()).unwrap();
        assert!(registry
            .update_session("1", fields(json!({"updated_at": "x", "status": "active"})))
            .unwrap());

        registry.clear_cache();
        assert_eq!(registry.get_all_sessions().len(), 2);
        assert!(registry.last_load_error().is_none());
        let session = registry.get_session("1").unwrap();
        assert!(session.registered_at.is_some());
        assert!(session.get("registered_at").is_none());
        assert_eq!(session.status(), Some("active"));

        let changes: Vec<Fields> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                RegistryEvent::Updated { changes, .. } => Some(changes.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(changes, vec![fields(json!({"status": "active"}))]);
    }

    #[test]
    fn batch_saves_once() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        registry.register_session("1", Fields::new()).unwrap();
        let events = record_events(&mut registry);

        registry.start_batch();
        registry.add_to_batch(BatchOp::register("2", Fields::new())).unwrap();
        registry.add_to_batch(BatchOp::register("3", Fields::new())).unwrap();
        registry
            .add_to_batch(BatchOp::update("1", fields(json!({"status": "active"}))))
            .unwrap();
        registry.add_to_batch(BatchOp::unregister("42")).unwrap();
        assert_eq!(registry.pending_batch_ops(), 4);

        let applied = registry.commit_batch().unwrap();

        assert_eq!(applied, 3);
        assert!(!registry.is_batching());
        assert_eq!(names(&events), vec!["loaded", "saved"]);
        assert_eq!(registry.count_sessions().total, 3);
        assert_eq!(registry.count_sessions().active, 1);
        assert_eq!(registry.get_next_id(), 4);
    }

    #[test]
    fn batch_ops_outside_batch_fail() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);

        let err = registry.add_to_batch(BatchOp::unregister("1")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::State);

        let err = registry.commit_batch().unwrap_err();
        assert_eq!(err.code(), ErrorCode::State);
        assert!(!registry.registry_path().exists());
    }

    #[test]
    fn cancel_batch_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);

        registry.start_batch();
        registry.add_to_batch(BatchOp::register("1", Fields::new())).unwrap();
        registry.cancel_batch();

        assert!(!registry.is_batching());
        assert!(!registry.registry_path().exists());
    }

    #[test]
    fn cleanup_removes_dead_sessions() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        for id in ["1", "2", "3"] {
            registry.register_session(id, Fields::new()).unwrap();
        }
        let events = record_events(&mut registry);

        let cleaned = registry.cleanup_stale_sessions(|id, _| id == "2").unwrap();

        assert_eq!(cleaned, 2);
        assert_eq!(
            registry.get_all_sessions().keys().collect::<Vec<_>>(),
            vec!["2"]
        );
        let mut removed: Vec<_> = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name() == "unregistered")
            .filter_map(|e| e.session_id().map(str::to_string))
            .collect();
        removed.sort();
        assert_eq!(removed, vec!["1", "3"]);
    }

    #[test]
    fn cleanup_with_everything_alive_does_not_save() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        registry.register_session("1", Fields::new()).unwrap();
        let events = record_events(&mut registry);

        assert_eq!(registry.cleanup_stale_sessions(|_, _| true).unwrap(), 0);
        assert_eq!(names(&events), vec!["loaded"]);
    }

    #[test]
    fn failed_save_emits_nothing() {
        let temp = TempDir::new().unwrap();
        let fs = Arc::new(FlakyFileSystem::default().fail(FsOp::Rename, 100, || {
            std::io::Error::new(std::io::ErrorKind::Other, "rename failed")
        }));
        let mut registry = registry_in(&temp)
            .with_filesystem(fs)
            .with_clock(Arc::new(ManualClock::default()));
        let events = record_events(&mut registry);

        let err = registry.register_session("1", Fields::new()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert_eq!(names(&events), vec!["loaded"]);
    }

    #[test]
    fn audit_log_records_mutations() {
        let temp = TempDir::new().unwrap();
        let mut registry = SessionRegistry::new(
            temp.path(),
            RegistryOptions {
                audit_log: true,
                ..RegistryOptions::default()
            },
        )
        .unwrap();

        registry.register_session("1", Fields::new()).unwrap();
        registry.update_session("1", fields(json!({"a": 1}))).unwrap();
        registry.unregister_session("1").unwrap();

        let actions: Vec<String> = std::fs::read_to_string(registry.audit_log_path())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["action"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            actions,
            vec!["save", "register", "save", "update", "save", "unregister"]
        );
    }

    #[test]
    fn once_variants_emit_no_events() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        let events = record_events(&mut registry);

        let mut doc = registry.load_once();
        doc.insert_session("7", Fields::new(), chrono::Utc::now());
        registry.save_once(&mut doc).unwrap();

        assert!(names(&events).is_empty());
        registry.clear_cache();
        assert_eq!(registry.load_once().next_id, 8);
    }

    #[test]
    fn unsubscribed_listener_is_silent() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry_in(&temp);
        let events = Arc::new(Mutex::new(0));
        let sink = events.clone();
        let id = registry.subscribe(move |_| *sink.lock().unwrap() += 1);
        assert_eq!(registry.listener_count(), 1);

        assert!(registry.unsubscribe(id));
        registry.register_session("1", Fields::new()).unwrap();
        assert_eq!(*events.lock().unwrap(), 0);
    }
}
