//! Deduplication of concurrent upstream fetches for the same key.
//!
//! The cache itself tracks no in-flight state: two concurrent misses on
//! one key would trigger two upstream calls. Collaborators that need the
//! guarantee layer a [`FetchCoalescer`] above the manager — the second
//! caller waits on the first's per-key gate, re-checks the cache, and is
//! served from it without touching upstream.
//!
//! Loader errors propagate to every caller that ran the loader and are
//! never cached; negative caching remains an explicit decision via
//! [`CacheManager::mark_negative`](crate::CacheManager::mark_negative).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::Result;
use crate::domain::CacheDomain;
use crate::manager::CacheManager;
use crate::telemetry;

/// Per-key in-flight gate above a [`CacheManager`].
///
/// One instance per collaborator is typical; gates are keyed by the full
/// cache key, so distinct domains never contend.
#[derive(Default)]
pub struct FetchCoalescer {
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl FetchCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get `key` from the cache, or load it exactly once and cache the
    /// result with `ttl`.
    ///
    /// Callers racing on the same key serialize on a per-key gate; the
    /// winner runs `loader`, everyone else is served the cached result.
    pub async fn fetch<F, Fut>(
        &self,
        cache: &CacheManager,
        domain: CacheDomain,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Some(hit) = cache.get(domain, key).await {
            return Ok(hit);
        }

        // Scope the shard lock: holding a dashmap guard across an await
        // would deadlock against other callers of the same shard.
        let gate = {
            let entry = self.inflight.entry(key.to_string()).or_default();
            Arc::clone(entry.value())
        };
        let guard = gate.lock().await;

        // Another caller may have loaded while we waited on the gate.
        if let Some(hit) = cache.get(domain, key).await {
            metrics::counter!(telemetry::COALESCED_FETCHES_TOTAL).increment(1);
            drop(guard);
            self.cleanup(key, &gate);
            return Ok(hit);
        }

        let result = loader().await;
        if let Ok(payload) = &result {
            cache.set(domain, key, payload.clone(), ttl);
        }
        drop(guard);
        self.cleanup(key, &gate);
        result
    }

    /// Drop the gate once nobody else holds it. Best-effort: a gate that
    /// survives a race is reused by the next fetch, not leaked forever.
    fn cleanup(&self, key: &str, gate: &Arc<Mutex<()>>) {
        // Two references mean map + us: no other caller is waiting.
        if Arc::strong_count(gate) <= 2 {
            self.inflight.remove_if(key, |_, g| Arc::strong_count(g) <= 2);
        }
    }
}
