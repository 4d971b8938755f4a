//! Tagged in-memory cache for gateway responses.
//!
//! Entries are keyed by the query descriptor's fingerprint and remember the
//! tag they were stored under. Invalidation drops every entry carrying a
//! tag; since the gateway uses one tag process-wide, that is the whole
//! cache. There is no TTL: an entry lives until the webhook invalidates it
//! or capacity pressure evicts it.
//!
//! Every invalidation bumps a generation counter. A fetch that started
//! before an invalidation carries the old generation and its result is not
//! stored, so the next read after the webhook always goes upstream.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::future::Cache;
use pressroom_core::CacheTag;
use serde_json::Value;

/// Default cache capacity (number of query results).
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Cached query result with metadata.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    /// The `data` member of the GraphQL response.
    pub data: Arc<Value>,
    /// Tag the entry was stored under.
    pub tag: CacheTag,
    /// When this entry was cached.
    pub cached_at: chrono::DateTime<chrono::Utc>,
}

/// Fingerprint-keyed response cache with tag invalidation.
#[derive(Clone)]
pub struct TaggedCache {
    inner: Cache<u64, CachedEntry>,
    generation: Arc<AtomicU64>,
}

impl TaggedCache {
    pub fn new(capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .support_invalidation_closures()
            .build();
        Self {
            inner,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current invalidation generation. Read it before fetching.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub async fn get(&self, key: u64) -> Option<CachedEntry> {
        self.inner.get(&key).await
    }

    /// Store a result fetched during `generation`.
    ///
    /// Returns `false` without storing anything if an invalidation ran since
    /// `generation` was read.
    pub async fn insert(
        &self,
        key: u64,
        tag: CacheTag,
        data: Arc<Value>,
        generation: u64,
    ) -> bool {
        if self.generation() != generation {
            return false;
        }
        let entry = CachedEntry {
            data,
            tag,
            cached_at: chrono::Utc::now(),
        };
        self.inner.insert(key, entry).await;

        // An invalidation that bumped the generation before the insert
        // landed may have registered its predicate too early to see it.
        if self.generation() != generation {
            self.inner.invalidate(&key).await;
            return false;
        }
        true
    }

    /// Drop every entry stored under `tag`.
    ///
    /// Entries inserted after this call are unaffected.
    pub fn invalidate_tag(&self, tag: CacheTag) -> anyhow::Result<()> {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.inner
            .invalidate_entries_if(move |_, entry| entry.tag == tag)
            .map_err(|e| anyhow::anyhow!("cache invalidation failed: {e}"))?;
        tracing::info!(tag = %tag, "cache tag invalidated");
        Ok(())
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for TaggedCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for TaggedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressroom_core::CACHE_TAG;
    use serde_json::json;

    #[tokio::test]
    async fn insert_then_get() {
        let cache = TaggedCache::default();
        assert!(cache.insert(1, CACHE_TAG, Arc::new(json!({"a": 1})), 0).await);
        let entry = cache.get(1).await.unwrap();
        assert_eq!(*entry.data, json!({"a": 1}));
        assert_eq!(entry.tag, CACHE_TAG);
        assert!(cache.get(2).await.is_none());
    }

    #[tokio::test]
    async fn invalidate_tag_clears_every_entry() {
        let cache = TaggedCache::default();
        for key in 0..5 {
            cache.insert(key, CACHE_TAG, Arc::new(json!(key)), 0).await;
        }
        cache.invalidate_tag(CACHE_TAG).unwrap();
        for key in 0..5 {
            assert!(cache.get(key).await.is_none(), "entry {key} survived");
        }
    }

    #[tokio::test]
    async fn entries_after_invalidation_survive() {
        let cache = TaggedCache::default();
        cache.insert(1, CACHE_TAG, Arc::new(json!("old")), 0).await;
        cache.invalidate_tag(CACHE_TAG).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let generation = cache.generation();
        assert!(cache.insert(1, CACHE_TAG, Arc::new(json!("new")), generation).await);
        assert_eq!(*cache.get(1).await.unwrap().data, json!("new"));
    }

    #[tokio::test]
    async fn results_from_before_invalidation_are_not_stored() {
        let cache = TaggedCache::default();
        let generation = cache.generation();
        cache.invalidate_tag(CACHE_TAG).unwrap();
        assert_ne!(cache.generation(), generation);
        assert!(!cache.insert(1, CACHE_TAG, Arc::new(json!("old")), generation).await);
        assert!(cache.get(1).await.is_none());
    }
}
