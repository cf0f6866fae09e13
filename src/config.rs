//! Configuration file and environment overrides.
//!
//! A [`Config`] is read from YAML, then optionally overlaid with
//! `STATEKEEP_*` environment variables, and finally turned into the option
//! structs the store and registry take.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ClassifiedError, Result};
use crate::registry::RegistryOptions;
use crate::store::{StoreOptions, SweepOptions};
use crate::taxonomy::{from_io, ErrorCode};

/// Conventional config file name.
pub const CONFIG_FILE: &str = "statekeep.yml";

/// Tunables for the store, janitor and registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Base backoff in milliseconds.
    pub backoff_ms: u64,
    /// JSON indentation.
    pub indent: usize,
    pub create_dir: bool,
    pub secure_mode: bool,
    pub warn_insecure: bool,
    /// Registry cache lifetime in milliseconds.
    pub cache_ttl_ms: u64,
    pub audit_log: bool,
    /// Overrides the default sessions directory.
    pub sessions_dir: Option<PathBuf>,
    /// Minimum age of temp files the janitor removes.
    pub temp_max_age_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_ms: 100,
            indent: 2,
            create_dir: true,
            secure_mode: false,
            warn_insecure: false,
            cache_ttl_ms: 10_000,
            audit_log: false,
            sessions_dir: None,
            temp_max_age_ms: 86_400_000,
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| from_io(e, format!("Failed to read {}", path.display())))?;
        Self::parse(&content).map_err(|e| e.with_context("path", path.display().to_string()))
    }

    /// Parse YAML text. Empty text yields defaults.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| {
            ClassifiedError::new(ErrorCode::Parse, format!("Invalid config: {}", e)).with_cause(e)
        })
    }

    /// Apply `STATEKEEP_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` in place of the process environment.
    ///
    /// Values that do not parse are ignored with a warning.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_with(&lookup, "STATEKEEP_RETRIES", &mut self.retries);
        override_with(&lookup, "STATEKEEP_BACKOFF_MS", &mut self.backoff_ms);
        override_with(&lookup, "STATEKEEP_CACHE_TTL_MS", &mut self.cache_ttl_ms);
        override_flag(&lookup, "STATEKEEP_AUDIT_LOG", &mut self.audit_log);
        override_flag(&lookup, "STATEKEEP_SECURE_MODE", &mut self.secure_mode);
    }

    pub fn store_options<T>(&self) -> StoreOptions<T> {
        StoreOptions::default()
            .with_retries(self.retries)
            .with_backoff(Duration::from_millis(self.backoff_ms))
            .with_indent(self.indent)
            .with_create_dir(self.create_dir)
            .with_secure_mode(self.secure_mode)
            .with_warn_insecure(self.warn_insecure)
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            sessions_dir: self.sessions_dir.clone(),
            cache_ttl: Duration::from_millis(self.cache_ttl_ms),
            audit_log: self.audit_log,
            store: self.store_options(),
        }
    }

    pub fn sweep_options(&self) -> SweepOptions {
        SweepOptions {
            max_age: Duration::from_millis(self.temp_max_age_ms),
            dry_run: false,
        }
    }

    /// The config as JSON, for diagnostics.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn override_with<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => warn!("ignoring {}={:?}: not a valid number", key, raw),
        }
    }
}

fn override_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut bool) {
    if let Some(raw) = lookup(key) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => *target = true,
            "0" | "false" | "no" | "off" | "" => *target = false,
            _ => warn!("ignoring {}={:?}: expected a boolean", key, raw),
        }
    }
}
