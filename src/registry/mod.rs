//! Session registry built on the atomic document store.
//!
//! This module provides [`SessionRegistry`], a map of session id to
//! [`SessionRecord`] persisted as one `registry.json`, with:
//! - A short-lived in-memory cache of the last load
//! - Synchronous [`RegistryEvent`] listeners
//! - Batched mutations committed in a single write
//! - Liveness-driven cleanup and an optional audit log

mod audit;
mod batch;
mod cache;
mod document;
mod events;
mod session_registry;

pub use audit::{AuditAction, AUDIT_LOG_FILE};
pub use batch::BatchOp;
pub use cache::DEFAULT_CACHE_TTL;
pub use document::{
    Fields, RegistryDocument, SessionCounts, SessionRecord, ACTIVE_STATUS, SCHEMA_VERSION,
};
pub use events::{ListenerId, RegistryEvent};
pub use session_registry::{default_sessions_dir, RegistryOptions, SessionRegistry, REGISTRY_FILE};
