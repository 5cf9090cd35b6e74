//! Tests for [`CacheManager`] — tier orchestration, promotion, and
//! degraded-mode behavior, using an in-memory fake durable tier.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use muninn::{
    CacheDomain, CacheEntry, CacheManager, ContentKind, DomainSummary, DurableStore,
    DurableSummary, TtlConfig,
};
use serde_json::json;

// ============================================================================
// Fake durable tier
// ============================================================================

#[derive(Default)]
struct FakeDurable {
    connected: AtomicBool,
    entries: Mutex<HashMap<String, CacheEntry>>,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
}

impl FakeDurable {
    fn connected() -> Arc<Self> {
        let fake = Self::default();
        fake.connected.store(true, Ordering::SeqCst);
        Arc::new(fake)
    }

    fn disconnected() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn preload(&self, key: &str, entry: CacheEntry) {
        self.entries.lock().unwrap().insert(key.to_string(), entry);
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl DurableStore for FakeDurable {
    async fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn get(&self, _domain: CacheDomain, key: &str) -> Option<CacheEntry> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let entry = self.entries.lock().unwrap().get(key).cloned()?;
        // Mirror the contract: an expired record reads as a miss.
        if entry.is_expired() { None } else { Some(entry) }
    }

    async fn set(&self, _domain: CacheDomain, key: &str, entry: &CacheEntry) {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), entry.clone());
    }

    async fn clear_by_prefix(&self, _domain: CacheDomain, prefix: &str) -> u64 {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        (before - entries.len()) as u64
    }

    async fn clear_all(&self) -> u64 {
        let mut entries = self.entries.lock().unwrap();
        let removed = entries.len() as u64;
        entries.clear();
        removed
    }

    async fn summary(&self) -> Option<DurableSummary> {
        let entries = self.entries.lock().unwrap();
        let mut per_domain = BTreeMap::new();
        per_domain.insert(
            "all".to_string(),
            DomainSummary {
                total: entries.len() as u64,
                active: entries.len() as u64,
                expired: 0,
                approx_entry_bytes: 0,
            },
        );
        Some(DurableSummary { per_domain })
    }
}

fn hybrid(durable: Arc<FakeDurable>) -> CacheManager {
    CacheManager::with_durable(TtlConfig::default(), durable, 16)
}

/// Wait until the background writer has drained a write, or time out.
async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 1s");
}

// ============================================================================
// Fast-tier behavior
// ============================================================================

#[tokio::test]
async fn memory_only_set_then_get() {
    let cache = CacheManager::memory_only(TtlConfig::default());
    cache.set(CacheDomain::Metadata, "metadata:series:81189:eng", json!({"ok": true}), Duration::from_secs(60));
    assert_eq!(
        cache.get(CacheDomain::Metadata, "metadata:series:81189:eng").await,
        Some(json!({"ok": true}))
    );
    assert!(!cache.has_durable());
}

#[tokio::test]
async fn get_as_decodes_payload() {
    #[derive(serde::Deserialize, PartialEq, Debug)]
    struct Title {
        name: String,
    }

    let cache = CacheManager::memory_only(TtlConfig::default());
    cache.set(CacheDomain::Metadata, "metadata:series:1:eng", json!({"name": "Lost"}), Duration::from_secs(60));

    let hit: Option<Title> = cache.get_as(CacheDomain::Metadata, "metadata:series:1:eng").await;
    assert_eq!(hit, Some(Title { name: "Lost".to_string() }));

    // Undecodable payloads read as misses, not errors.
    cache.set(CacheDomain::Metadata, "metadata:series:2:eng", json!(42), Duration::from_secs(60));
    let miss: Option<Title> = cache.get_as(CacheDomain::Metadata, "metadata:series:2:eng").await;
    assert!(miss.is_none());
}

// ============================================================================
// Promotion
// ============================================================================

#[tokio::test]
async fn durable_hit_is_promoted_into_fast_tier() {
    let durable = FakeDurable::connected();
    durable.preload(
        "metadata:series:81189:eng",
        CacheEntry::new(json!({"name": "Breaking Bad"}), Duration::from_secs(3600)),
    );
    let cache = hybrid(Arc::clone(&durable));

    let first = cache.get(CacheDomain::Metadata, "metadata:series:81189:eng").await;
    assert_eq!(first, Some(json!({"name": "Breaking Bad"})));
    assert_eq!(durable.get_calls.load(Ordering::SeqCst), 1);

    // Second read is served from the fast tier: no further durable call.
    let second = cache.get(CacheDomain::Metadata, "metadata:series:81189:eng").await;
    assert_eq!(second, first);
    assert_eq!(durable.get_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn promoted_copy_keeps_the_original_expiry() {
    let durable = FakeDurable::connected();
    // Entry with only ~500ms of life left at promotion time.
    let created = Utc::now() - chrono::Duration::milliseconds(1500);
    durable.preload(
        "artwork:series:5",
        CacheEntry::from_parts(json!("poster.jpg"), created, Duration::from_secs(2)),
    );
    let cache = hybrid(Arc::clone(&durable));

    assert!(cache.get(CacheDomain::Artwork, "artwork:series:5").await.is_some());
    tokio::time::sleep(Duration::from_millis(700)).await;
    // The promoted fast-tier copy expired with the original write.
    assert!(cache.get(CacheDomain::Artwork, "artwork:series:5").await.is_none());
}

// ============================================================================
// Write-through and degraded mode
// ============================================================================

#[tokio::test]
async fn set_reaches_the_durable_tier_asynchronously() {
    let durable = FakeDurable::connected();
    let cache = hybrid(Arc::clone(&durable));

    cache.set(CacheDomain::Search, "search:series:eng:friends", json!([1, 2, 3]), Duration::from_secs(3600));
    eventually(|| durable.contains("search:series:eng:friends")).await;
}

#[tokio::test]
async fn set_and_get_work_while_durable_is_disconnected() {
    let durable = FakeDurable::disconnected();
    let cache = hybrid(Arc::clone(&durable));

    cache.set(CacheDomain::Search, "search:series:eng:friends", json!(["results"]), Duration::from_secs(2 * 3600));
    assert_eq!(
        cache.get(CacheDomain::Search, "search:series:eng:friends").await,
        Some(json!(["results"]))
    );
    // The disconnected tier was never consulted on the read path.
    assert_eq!(durable.get_calls.load(Ordering::SeqCst), 0);
    assert!(cache.has_durable());
    assert!(!cache.durable_connected());
}

// ============================================================================
// Clearing and stats
// ============================================================================

#[tokio::test]
async fn clear_by_prefix_aggregates_both_tiers() {
    let durable = FakeDurable::connected();
    durable.preload(
        "metadata:series:42:deu",
        CacheEntry::new(json!(2), Duration::from_secs(3600)),
    );
    let cache = hybrid(Arc::clone(&durable));
    cache.set(CacheDomain::Metadata, "metadata:series:42:eng", json!(1), Duration::from_secs(3600));
    cache.set(CacheDomain::Metadata, "metadata:series:43:eng", json!(3), Duration::from_secs(3600));
    eventually(|| durable.contains("metadata:series:43:eng")).await;

    let removed = cache.clear_by_prefix(CacheDomain::Metadata, "metadata:series:42").await;
    // metadata:series:42:eng in both tiers + metadata:series:42:deu in L2.
    assert_eq!(removed, 3);
    assert!(cache.get(CacheDomain::Metadata, "metadata:series:43:eng").await.is_some());
}

#[tokio::test]
async fn clear_all_resets_both_tiers() {
    let durable = FakeDurable::connected();
    let cache = hybrid(Arc::clone(&durable));
    cache.set(CacheDomain::Search, "search:a", json!(1), Duration::from_secs(60));
    cache.set(CacheDomain::Catalog, "catalog:series:eng:1", json!(2), Duration::from_secs(60));
    eventually(|| durable.contains("catalog:series:eng:1")).await;

    let removed = cache.clear_all().await;
    assert!(removed >= 4, "both tiers should report their counts, got {removed}");
    assert!(cache.get(CacheDomain::Search, "search:a").await.is_none());
}

#[tokio::test]
async fn stats_merge_fast_and_durable() {
    let durable = FakeDurable::connected();
    let cache = hybrid(Arc::clone(&durable));
    cache.set(CacheDomain::Search, "search:a", json!(1), Duration::from_secs(60));

    let stats = cache.stats().await;
    assert_eq!(stats.fast.per_domain["search"], 1);
    assert!(stats.durable.is_some());

    let memory_only = CacheManager::memory_only(TtlConfig::default());
    assert!(memory_only.stats().await.durable.is_none());
}

// ============================================================================
// Domain wrappers
// ============================================================================

#[tokio::test]
async fn metadata_wrappers_round_trip() {
    let cache = CacheManager::memory_only(TtlConfig::default());
    cache.set_metadata(ContentKind::Series, 81189, "eng", json!({"name": "Breaking Bad"}));
    assert_eq!(
        cache.get_metadata(ContentKind::Series, 81189, "eng").await,
        Some(json!({"name": "Breaking Bad"}))
    );
    // Language is part of the key.
    assert!(cache.get_metadata(ContentKind::Series, 81189, "deu").await.is_none());
}

#[tokio::test]
async fn search_wrapper_normalizes_queries() {
    let cache = CacheManager::memory_only(TtlConfig::default());
    cache.set_search(ContentKind::Series, "eng", "Breaking  Bad", json!([81189]));
    assert_eq!(
        cache.get_search(ContentKind::Series, "eng", "breaking bad").await,
        Some(json!([81189]))
    );
}

#[tokio::test]
async fn negative_marks_expire_like_any_entry() {
    let ttl = TtlConfig {
        negative_secs: 0,
        ..TtlConfig::default()
    };
    let cache = CacheManager::memory_only(ttl);
    cache.mark_negative("search:series:eng:doesnotexist");
    // TTL of zero: already expired, reads as not-negative.
    assert!(!cache.is_negative("search:series:eng:doesnotexist").await);

    let cache = CacheManager::memory_only(TtlConfig::default());
    cache.mark_negative("search:series:eng:doesnotexist");
    assert!(cache.is_negative("search:series:eng:doesnotexist").await);
    assert!(!cache.is_negative("search:series:eng:exists").await);
}
