//! Time-limited snapshot of the last loaded registry.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::document::RegistryDocument;

/// Default lifetime of a cached registry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub(crate) struct RegistryCache {
    ttl: Duration,
    entry: Option<CachedRegistry>,
}

#[derive(Debug)]
struct CachedRegistry {
    registry: RegistryDocument,
    cached_at: DateTime<Utc>,
}

impl RegistryCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// The cached registry, if it is younger than the TTL at `now`.
    pub(crate) fn get(&self, now: DateTime<Utc>) -> Option<&RegistryDocument> {
        let entry = self.entry.as_ref()?;
        let age = now.signed_duration_since(entry.cached_at);
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        if age < ttl {
            Some(&entry.registry)
        } else {
            None
        }
    }

    pub(crate) fn put(&mut self, registry: RegistryDocument, now: DateTime<Utc>) {
        self.entry = Some(CachedRegistry {
            registry,
            cached_at: now,
        });
    }

    pub(crate) fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn fresh_until_ttl() {
        let mut cache = RegistryCache::new(Duration::from_secs(10));
        cache.put(RegistryDocument::empty("p", at(0)), at(0));

        assert!(cache.get(at(0)).is_some());
        assert!(cache.get(at(9)).is_some());
        assert!(cache.get(at(10)).is_none());
    }

    #[test]
    fn empty_and_cleared() {
        let mut cache = RegistryCache::new(DEFAULT_CACHE_TTL);
        assert!(cache.get(at(0)).is_none());

        cache.put(RegistryDocument::empty("p", at(0)), at(0));
        cache.clear();
        assert!(cache.get(at(0)).is_none());
    }

    #[test]
    fn zero_ttl_never_hits() {
        let mut cache = RegistryCache::new(Duration::ZERO);
        cache.put(RegistryDocument::empty("p", at(0)), at(0));
        assert!(cache.get(at(0)).is_none());
    }
}
