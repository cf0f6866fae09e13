//! Statekeep - crash-safe JSON state for tools that share a project.
//!
//! Statekeep persists small JSON documents so that a crash, a kill or a
//! concurrent writer never leaves a half-written file behind, and layers a
//! session registry on top for tools that track several sessions in one
//! project.
//!
//! # Modules
//!
//! - [`taxonomy`] - Error catalog, classification, and formatting
//! - [`error`] - The classified error type and result alias
//! - [`store`] - Atomic JSON documents with retry and temp-file sweeping
//! - [`registry`] - Session registry with caching, events, and batching
//! - [`config`] - YAML configuration with environment overrides
//! - [`clock`] - Time source seam
//! - [`logging`] - Tracing subscriber setup
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use statekeep::registry::{Fields, RegistryOptions, SessionRegistry};
//!
//! let dir = tempfile::tempdir()?;
//! let mut registry = SessionRegistry::new(dir.path(), RegistryOptions::default())?;
//!
//! let data: Fields = json!({"status": "active"}).as_object().cloned().unwrap_or_default();
//! registry.register_session("5", data)?;
//! assert_eq!(registry.get_next_id(), 6);
//! assert_eq!(registry.count_sessions().active, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod store;
pub mod taxonomy;

pub use error::{ClassifiedError, Result};
