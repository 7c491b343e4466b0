//! Semantic cache implementations
//!
//! - [`InMemorySemanticCache`]: process-local store with TTL and a size cap
//! - [`PolicyGatedCache`]: the only way the chat pipeline touches a cache;
//!   refuses reads and writes for requests whose policy bypasses caching

use async_trait::async_trait;
use bastion_kernel::cache::{CacheKey, CachedAnswer, SemanticCache};
use bastion_kernel::config::CacheSettings;
use bastion_kernel::policy::RequestPolicy;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    tenant: String,
    answer: CachedAnswer,
    inserted_at: Instant,
    /// Insertion order, for eviction
    seq: u64,
}

/// Hit/miss counters of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// In-process semantic cache keyed by [`CacheKey::fingerprint`].
#[derive(Debug)]
pub struct InMemorySemanticCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
    max_entries: usize,
    seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemorySemanticCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            seq: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.ttl(), settings.max_entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    fn evict_oldest(&self) {
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().seq)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    debug!(key = %key, "cache entry evicted");
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl SemanticCache for InMemorySemanticCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedAnswer> {
        let fingerprint = key.fingerprint();
        let found = self
            .entries
            .get(&fingerprint)
            .map(|entry| (entry.inserted_at.elapsed() < self.ttl, entry.answer.clone()));

        match found {
            Some((true, answer)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(answer)
            }
            Some((false, _)) => {
                self.entries.remove(&fingerprint);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn put(&self, key: CacheKey, answer: CachedAnswer) {
        let entry = Entry {
            tenant: key.tenant.clone(),
            answer,
            inserted_at: Instant::now(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };
        self.entries.insert(key.fingerprint(), entry);
        self.evict_oldest();
    }

    async fn invalidate_tenant(&self, tenant: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.tenant != tenant);
        let removed = before.saturating_sub(self.entries.len());
        debug!(tenant, removed, "tenant cache invalidated");
        removed
    }
}

/// Cache access that honours the request policy.
#[derive(Clone)]
pub struct PolicyGatedCache {
    inner: Option<Arc<dyn SemanticCache>>,
}

impl std::fmt::Debug for PolicyGatedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyGatedCache")
            .field("enabled", &self.inner.is_some())
            .finish()
    }
}

impl PolicyGatedCache {
    pub fn new(inner: Arc<dyn SemanticCache>) -> Self {
        Self { inner: Some(inner) }
    }

    /// A gate with no cache behind it; every read misses.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// In-memory cache sized from `settings`, or a disabled gate.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        if settings.enabled {
            Self::new(Arc::new(InMemorySemanticCache::from_settings(settings)))
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    fn for_policy(&self, policy: &RequestPolicy) -> Option<&Arc<dyn SemanticCache>> {
        if policy.should_bypass_cache() {
            debug!("semantic cache bypassed for sensitive request");
            return None;
        }
        self.inner.as_ref()
    }

    pub async fn get(&self, policy: &RequestPolicy, key: &CacheKey) -> Option<CachedAnswer> {
        self.for_policy(policy)?.get(key).await
    }

    /// Store `answer` unless the policy forbids it. Returns whether it was
    /// written.
    pub async fn put(&self, policy: &RequestPolicy, key: CacheKey, answer: CachedAnswer) -> bool {
        match self.for_policy(policy) {
            Some(cache) => {
                cache.put(key, answer).await;
                true
            }
            None => false,
        }
    }

    pub async fn invalidate_tenant(&self, tenant: &str) -> usize {
        match &self.inner {
            Some(cache) => cache.invalidate_tenant(tenant).await,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_kernel::policy::HandlingMode;

    fn key(tenant: &str, question: &str) -> CacheKey {
        CacheKey::new(tenant, "sales", question, ["top_customers"], None)
    }

    fn answer(content: &str) -> CachedAnswer {
        CachedAnswer {
            content: content.into(),
            model: "test-model".into(),
        }
    }

    #[tokio::test]
    async fn normalized_questions_hit() {
        let cache = InMemorySemanticCache::new(Duration::from_secs(60), 10);
        cache.put(key("acme", "Top customers?"), answer("a")).await;

        let hit = cache.get(&key("acme", "  top CUSTOMERS ")).await;
        assert_eq!(hit, Some(answer("a")));
        assert!(cache.get(&key("globex", "top customers")).await.is_none());
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, entries: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = InMemorySemanticCache::new(Duration::from_secs(60), 10);
        cache.put(key("acme", "q"), answer("a")).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get(&key("acme", "q")).await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&key("acme", "q")).await.is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired() {
        let cache = InMemorySemanticCache::new(Duration::from_secs(10), 10);
        cache.put(key("acme", "old"), answer("a")).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.put(key("acme", "new"), answer("b")).await;
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.get(&key("acme", "new")).await.is_some());
    }

    #[tokio::test]
    async fn oldest_entry_is_evicted_at_capacity() {
        let cache = InMemorySemanticCache::new(Duration::from_secs(60), 2);
        cache.put(key("acme", "one"), answer("1")).await;
        cache.put(key("acme", "two"), answer("2")).await;
        cache.put(key("acme", "three"), answer("3")).await;

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("acme", "one")).await.is_none());
        assert!(cache.get(&key("acme", "three")).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_tenant_removes_only_that_tenant() {
        let cache = InMemorySemanticCache::new(Duration::from_secs(60), 10);
        cache.put(key("acme", "a"), answer("1")).await;
        cache.put(key("acme", "b"), answer("2")).await;
        cache.put(key("globex", "a"), answer("3")).await;

        assert_eq!(cache.invalidate_tenant("acme").await, 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn gate_refuses_sensitive_requests() {
        let inner = Arc::new(InMemorySemanticCache::new(Duration::from_secs(60), 10));
        let gate = PolicyGatedCache::new(inner.clone());
        let clean = RequestPolicy::default();
        let sensitive = RequestPolicy::new(true, HandlingMode::Redact);

        assert!(!gate.put(&sensitive, key("acme", "q"), answer("secret")).await);
        assert!(inner.is_empty());

        assert!(gate.put(&clean, key("acme", "q"), answer("public")).await);
        assert_eq!(gate.get(&clean, &key("acme", "q")).await, Some(answer("public")));
        assert!(gate.get(&sensitive, &key("acme", "q")).await.is_none());
        assert_eq!(inner.stats().hits, 1);
    }

    #[tokio::test]
    async fn disabled_gate_never_stores() {
        let gate = PolicyGatedCache::from_settings(&CacheSettings {
            enabled: false,
            ..Default::default()
        });
        let policy = RequestPolicy::default();
        assert!(!gate.is_enabled());
        assert!(!gate.put(&policy, key("acme", "q"), answer("a")).await);
        assert!(gate.get(&policy, &key("acme", "q")).await.is_none());
    }
}
