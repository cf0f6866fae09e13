//! Registry document types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary caller-supplied session fields.
pub type Fields = Map<String, Value>;

/// Schema version written into new registries.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Status value counted as active by [`SessionCounts`].
pub const ACTIVE_STATUS: &str = "active";

/// The whole persisted registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Lowest id not yet handed out. Never decreases.
    #[serde(default = "default_next_id")]
    pub next_id: u64,

    #[serde(default)]
    pub project_name: String,

    #[serde(default)]
    pub sessions: BTreeMap<String, SessionRecord>,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated: DateTime<Utc>,

    /// Top-level fields this version does not know about.
    #[serde(flatten)]
    pub extra: Fields,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_next_id() -> u64 {
    1
}

impl RegistryDocument {
    /// An empty registry created at `now`.
    pub fn empty(project_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            schema_version: default_schema_version(),
            next_id: 1,
            project_name: project_name.into(),
            sessions: BTreeMap::new(),
            created: now,
            updated: now,
            extra: Fields::new(),
        }
    }

    /// Insert or replace a session, stamping `registered_at`.
    ///
    /// Caller-supplied `registered_at`/`updated_at` keys are dropped; the
    /// stamp wins. An id with a leading number at or above `next_id` moves
    /// `next_id` past it.
    pub fn insert_session(&mut self, id: &str, mut fields: Fields, now: DateTime<Utc>) {
        strip_timestamps(&mut fields);
        self.sessions.insert(
            id.to_string(),
            SessionRecord {
                fields,
                registered_at: Some(now),
                updated_at: None,
            },
        );

        if let Some(number) = numeric_id(id) {
            if number >= self.next_id {
                self.next_id = number.saturating_add(1);
            }
        }
    }

    /// Remove a session. Returns whether it existed.
    pub fn remove_session(&mut self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Shallow-merge `updates` into an existing session, stamping `updated_at`.
    ///
    /// Returns false when the session does not exist.
    pub fn merge_session(&mut self, id: &str, updates: &Fields, now: DateTime<Utc>) -> bool {
        match self.sessions.get_mut(id) {
            Some(record) => {
                record.merge(updates);
                record.updated_at = Some(now);
                true
            }
            None => false,
        }
    }

    /// Tally sessions by status.
    pub fn counts(&self) -> SessionCounts {
        let total = self.sessions.len();
        let active = self.sessions.values().filter(|s| s.is_active()).count();
        SessionCounts {
            total,
            active,
            inactive: total - active,
        }
    }
}

/// One registered session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Everything the caller registered or updated.
    #[serde(flatten)]
    pub fields: Fields,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Look up a caller field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The `status` field, when it is a string.
    pub fn status(&self) -> Option<&str> {
        self.fields.get("status").and_then(Value::as_str)
    }

    pub fn is_active(&self) -> bool {
        self.status() == Some(ACTIVE_STATUS)
    }

    fn merge(&mut self, updates: &Fields) {
        for (key, value) in updates {
            if !is_timestamp_key(key) {
                self.fields.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Session totals by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounts {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

/// Keys owned by [`SessionRecord`]'s typed timestamps.
const TIMESTAMP_KEYS: [&str; 2] = ["registered_at", "updated_at"];

fn is_timestamp_key(key: &str) -> bool {
    TIMESTAMP_KEYS.contains(&key)
}

/// Remove the record-managed timestamp keys from caller fields.
///
/// Left in place they would serialize next to the typed stamps and the
/// registry could no longer be read back.
pub(crate) fn strip_timestamps(fields: &mut Fields) {
    for key in TIMESTAMP_KEYS {
        fields.remove(key);
    }
}

/// The leading decimal number of an id, ignoring leading whitespace.
///
/// `"7-feature"` is 7. Ids that start with anything else, including a minus
/// sign, have no number.
fn numeric_id(id: &str) -> Option<u64> {
    let trimmed = id.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    unsigned[..end].parse().ok()
}
