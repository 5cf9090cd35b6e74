//! The cache manager: both tiers behind one get/set contract.
//!
//! [`CacheManager`] is the single entry point collaborators use. Reads
//! check the fast tier first, fall through to the durable tier, and
//! promote durable hits back into memory with their remaining lifetime.
//! Writes land in the fast tier synchronously and reach the durable tier
//! through a bounded background queue — the hot path never waits on the
//! network, and no internal failure ever propagates to a caller: the
//! worst case under any fault is a miss.
//!
//! # Durable write queue
//!
//! Fire-and-forget durable writes go through a bounded
//! `tokio::sync::mpsc` channel drained by a single writer task, so a load
//! spike queues (and eventually sheds) writes instead of spawning
//! unbounded concurrent network calls. A shed write costs a durable-tier
//! miss later, nothing more.
//!
//! # Domain wrappers
//!
//! The `get_metadata`/`set_translation`/... helpers are pure
//! key-construction sugar over the four primitives (`get`, `set`,
//! `clear_by_prefix`, `clear_all`) plus the domain's configured TTL. They
//! hold no state of their own.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::TtlConfig;
use crate::domain::CacheDomain;
use crate::entry::CacheEntry;
use crate::keys::{self, ContentKind};
use crate::store::{DurableStore, DurableSummary, MemoryStore, TierStats};
use crate::telemetry;

/// Default capacity of the durable write queue.
///
/// 256 in-flight writes absorbs a burst (e.g. a catalog page fanning out
/// into per-title writes) while bounding memory held in queued envelopes.
pub const DEFAULT_WRITE_QUEUE: usize = 256;

/// Merged statistics from both tiers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub fast: TierStats,
    pub durable: Option<DurableSummary>,
}

struct WriteJob {
    domain: CacheDomain,
    key: String,
    entry: CacheEntry,
}

/// Unified two-tier cache. Construct via [`Muninn::builder()`](crate::Muninn)
/// or [`factory::from_config`](crate::factory::from_config), then share as
/// an `Arc` with every collaborator.
pub struct CacheManager {
    fast: Arc<MemoryStore>,
    durable: Option<Arc<dyn DurableStore>>,
    ttl: TtlConfig,
    write_tx: Option<mpsc::Sender<WriteJob>>,
}

impl CacheManager {
    /// Build a memory-only manager.
    pub fn memory_only(ttl: TtlConfig) -> Self {
        Self {
            fast: Arc::new(MemoryStore::new()),
            durable: None,
            ttl,
            write_tx: None,
        }
    }

    /// Build a hybrid manager over the given durable tier and spawn its
    /// writer task. Must be called within a tokio runtime.
    ///
    /// The durable tier starts disconnected; call
    /// [`connect`](Self::connect) from the process bootstrap.
    pub fn with_durable(
        ttl: TtlConfig,
        durable: Arc<dyn DurableStore>,
        write_queue: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<WriteJob>(write_queue.max(1));
        let writer_store = Arc::clone(&durable);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                writer_store.set(job.domain, &job.key, &job.entry).await;
            }
            debug!("durable write queue closed; writer task exiting");
        });
        Self {
            fast: Arc::new(MemoryStore::new()),
            durable: Some(durable),
            ttl,
            write_tx: Some(tx),
        }
    }

    /// Establish the durable-tier connection. Called once by the process
    /// bootstrap; a failure leaves the manager in degraded (memory-only)
    /// behavior without restarting anything.
    pub async fn connect(&self) {
        if let Some(durable) = &self.durable {
            durable.connect().await;
        }
    }

    /// Whether a durable tier was configured (connected or not).
    pub fn has_durable(&self) -> bool {
        self.durable.is_some()
    }

    /// Whether the durable tier is configured and currently connected.
    pub fn durable_connected(&self) -> bool {
        self.durable.as_ref().is_some_and(|d| d.is_connected())
    }

    /// Look up a payload.
    ///
    /// Fast-tier hit returns immediately. On a fast-tier miss the durable
    /// tier is consulted, and a hit there is promoted back into the fast
    /// tier with its original expiry, so the promoted copy never outlives
    /// the write that produced it.
    pub async fn get(&self, domain: CacheDomain, key: &str) -> Option<Value> {
        if let Some(payload) = self.fast.get(domain, key) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "domain" => domain.as_str(), "tier" => "fast")
                .increment(1);
            return Some(payload);
        }

        if let Some(durable) = &self.durable
            && durable.is_connected()
            && let Some(entry) = durable.get(domain, key).await
        {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "domain" => domain.as_str(), "tier" => "durable")
                .increment(1);
            self.fast.insert(domain, key, entry.clone());
            return Some(entry.payload);
        }

        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "domain" => domain.as_str()).increment(1);
        None
    }

    /// Look up and decode a payload. Decode failure is treated as a miss,
    /// never an error — the caller re-fetches and overwrites.
    pub async fn get_as<T: DeserializeOwned>(&self, domain: CacheDomain, key: &str) -> Option<T> {
        let payload = self.get(domain, key).await?;
        match serde_json::from_value(payload) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(domain = %domain, key, error = %e, "cached payload failed to decode; treating as miss");
                None
            }
        }
    }

    /// Insert or overwrite an entry.
    ///
    /// The fast-tier write is synchronous and infallible. The durable
    /// write is queued fire-and-forget; a full queue sheds the write with
    /// a warning rather than blocking the caller.
    pub fn set(&self, domain: CacheDomain, key: impl Into<String>, payload: Value, ttl: Duration) {
        let key = key.into();
        let entry = CacheEntry::new(payload, ttl);
        self.fast.insert(domain, key.clone(), entry.clone());
        metrics::counter!(telemetry::CACHE_WRITES_TOTAL, "domain" => domain.as_str()).increment(1);

        if let Some(tx) = &self.write_tx {
            match tx.try_send(WriteJob { domain, key, entry }) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(job)) => {
                    metrics::counter!(telemetry::WRITE_QUEUE_DROPS_TOTAL, "domain" => domain.as_str())
                        .increment(1);
                    warn!(domain = %domain, key = %job.key, "durable write queue full; dropping write");
                }
                // Writer task gone (shutdown); the fast-tier write stands.
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
    }

    /// [`set`](Self::set) using the domain's configured TTL.
    pub fn set_with_domain_ttl(&self, domain: CacheDomain, key: impl Into<String>, payload: Value) {
        self.set(domain, key, payload, self.ttl.for_domain(domain));
    }

    /// Remove every entry in `domain` whose key starts with `prefix`,
    /// from both tiers. Returns the aggregate count; if the durable tier
    /// is unreachable its portion reads as zero and the fast-tier count
    /// still reports.
    pub async fn clear_by_prefix(&self, domain: CacheDomain, prefix: &str) -> u64 {
        let fast = self.fast.clear_by_prefix(domain, prefix);
        let durable = match &self.durable {
            Some(store) if store.is_connected() => store.clear_by_prefix(domain, prefix).await,
            _ => 0,
        };
        debug!(domain = %domain, prefix, fast, durable, "cleared by prefix");
        fast + durable
    }

    /// Empty every domain in both tiers. Administrative reset only —
    /// never called on the request path.
    pub async fn clear_all(&self) -> u64 {
        let fast = self.fast.clear_all();
        let durable = match &self.durable {
            Some(store) if store.is_connected() => store.clear_all().await,
            _ => 0,
        };
        info!(fast, durable, "cleared all cache domains");
        fast + durable
    }

    /// Merged observability snapshot.
    pub async fn stats(&self) -> CacheStats {
        let durable = match &self.durable {
            Some(store) => store.summary().await,
            None => None,
        };
        CacheStats {
            fast: self.fast.stats(),
            durable,
        }
    }

    /// Spawn the periodic fast-tier sweep, bounding memory held by
    /// entries that expire and are never re-read.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let fast = Arc::clone(&self.fast);
        // tokio panics on a zero interval
        let interval = interval.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; skip the zeroth tick
            tick.tick().await;
            loop {
                tick.tick().await;
                let removed = fast.sweep_expired();
                metrics::counter!(telemetry::SWEEP_REMOVED_TOTAL).increment(removed);
                if removed > 0 {
                    debug!(removed, "swept expired fast-tier entries");
                }
            }
        })
    }

    // ========================================================================
    // Domain convenience wrappers — key construction + domain TTL only
    // ========================================================================

    pub async fn get_metadata(&self, kind: ContentKind, id: u64, language: &str) -> Option<Value> {
        self.get(CacheDomain::Metadata, &keys::metadata(kind, id, language))
            .await
    }

    pub fn set_metadata(&self, kind: ContentKind, id: u64, language: &str, payload: Value) {
        self.set_with_domain_ttl(CacheDomain::Metadata, keys::metadata(kind, id, language), payload);
    }

    pub async fn get_validation(&self, kind: ContentKind, id: u64) -> Option<Value> {
        self.get(CacheDomain::Validation, &keys::validation(kind, id))
            .await
    }

    pub fn set_validation(&self, kind: ContentKind, id: u64, payload: Value) {
        self.set_with_domain_ttl(CacheDomain::Validation, keys::validation(kind, id), payload);
    }

    pub async fn get_translation(
        &self,
        kind: ContentKind,
        id: u64,
        language: &str,
    ) -> Option<Value> {
        self.get(
            CacheDomain::Translations,
            &keys::translation(kind, id, language),
        )
        .await
    }

    pub fn set_translation(&self, kind: ContentKind, id: u64, language: &str, payload: Value) {
        self.set_with_domain_ttl(
            CacheDomain::Translations,
            keys::translation(kind, id, language),
            payload,
        );
    }

    pub async fn get_seasons(&self, series_id: u64, language: &str) -> Option<Value> {
        self.get(CacheDomain::Seasons, &keys::seasons(series_id, language))
            .await
    }

    pub fn set_seasons(&self, series_id: u64, language: &str, payload: Value) {
        self.set_with_domain_ttl(CacheDomain::Seasons, keys::seasons(series_id, language), payload);
    }

    pub async fn get_search(
        &self,
        kind: ContentKind,
        language: &str,
        query: &str,
    ) -> Option<Value> {
        self.get(CacheDomain::Search, &keys::search(kind, language, query))
            .await
    }

    pub fn set_search(&self, kind: ContentKind, language: &str, query: &str, payload: Value) {
        self.set_with_domain_ttl(
            CacheDomain::Search,
            keys::search(kind, language, query),
            payload,
        );
    }

    /// Record that a lookup came back empty, bounding repeated failing
    /// upstream calls to the negative domain's (short) TTL.
    pub fn mark_negative(&self, missed_key: &str) {
        self.set_with_domain_ttl(CacheDomain::Negative, keys::negative(missed_key), Value::Null);
    }

    /// Whether a lookup is known to currently have no valid upstream data.
    pub async fn is_negative(&self, missed_key: &str) -> bool {
        self.get(CacheDomain::Negative, &keys::negative(missed_key))
            .await
            .is_some()
    }
}
