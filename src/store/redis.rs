//! The durable (L2) tier: Redis-backed persistent cache.
//!
//! Values are stored as the JSON [`CacheEntry`] envelope under
//! `{namespace}:{key}`, written with `SET ... EX` so the server expires
//! dead records on its own even when nobody re-reads them. Reads filter on
//! the envelope's `expires_at` as well — the two expiry mechanisms are
//! independent and both must agree an entry is alive.
//!
//! # Failure semantics
//!
//! Every operation is wrapped in a timeout, and any I/O error, timeout, or
//! undecodable record is caught, counted, logged at warn, and converted to
//! a miss/no-op. Connection establishment happens once at startup via
//! [`connect`](DurableStore::connect); if it fails, the store stays
//! disconnected and every operation short-circuits. A connection that is
//! established and later drops is retried internally by redis's
//! `ConnectionManager` without blocking callers.
//!
//! Pattern deletion walks `SCAN MATCH ... COUNT` batches — never `KEYS`,
//! which would block the server on large keyspaces.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info, warn};

use super::{DomainSummary, DurableStore, DurableSummary};
use crate::domain::CacheDomain;
use crate::entry::CacheEntry;
use crate::telemetry;

/// Budget for the one-off startup connection attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Keys fetched per SCAN round trip.
const SCAN_BATCH: usize = 500;

/// Entries sampled per domain when building a summary.
const SUMMARY_SAMPLE: u64 = 50;

/// Timeout multiplier for multi-round-trip operations (clears, summaries)
/// relative to the single-call budget.
const BULK_TIMEOUT_MULT: u32 = 10;

/// Redis-backed implementation of [`DurableStore`].
pub struct RedisStore {
    url: String,
    namespace: String,
    op_timeout: Duration,
    conn: RwLock<Option<ConnectionManager>>,
}

impl RedisStore {
    /// Create a store handle. No I/O happens here; call
    /// [`connect`](DurableStore::connect) once at startup.
    pub fn new(url: impl Into<String>, namespace: impl Into<String>, op_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            namespace: namespace.into(),
            op_timeout,
            conn: RwLock::new(None),
        }
    }

    fn connection(&self) -> Option<ConnectionManager> {
        self.conn
            .read()
            .expect("connection lock poisoned")
            .clone()
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Run a fallible operation under a timeout, converting failure into
    /// `None` with a warning and an error counter.
    async fn guard<T>(
        &self,
        operation: &'static str,
        budget: Duration,
        fut: impl Future<Output = crate::Result<T>>,
    ) -> Option<T> {
        match tokio::time::timeout(budget, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                metrics::counter!(telemetry::DURABLE_ERRORS_TOTAL, "operation" => operation)
                    .increment(1);
                warn!(operation, error = %e, "durable store operation failed");
                None
            }
            Err(_) => {
                metrics::counter!(telemetry::DURABLE_ERRORS_TOTAL, "operation" => operation)
                    .increment(1);
                warn!(
                    operation,
                    budget_ms = budget.as_millis() as u64,
                    "durable store operation timed out"
                );
                None
            }
        }
    }

    /// SCAN out every key matching `pattern`, deleting in batches.
    async fn scan_delete(&self, conn: &mut ConnectionManager, pattern: &str) -> crate::Result<u64> {
        let mut cursor: u64 = 0;
        let mut removed = 0u64;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(conn)
                .await?;
            if !keys.is_empty() {
                let n: u64 = conn.del(keys).await?;
                removed += n;
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(removed)
    }

    /// Count every key matching `pattern`, keeping the first
    /// [`SUMMARY_SAMPLE`] for inspection.
    async fn scan_count(
        &self,
        conn: &mut ConnectionManager,
        pattern: &str,
    ) -> crate::Result<(u64, Vec<String>)> {
        let mut cursor: u64 = 0;
        let mut total = 0u64;
        let mut sample = Vec::new();
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(conn)
                .await?;
            total += keys.len() as u64;
            for key in keys {
                if (sample.len() as u64) < SUMMARY_SAMPLE {
                    sample.push(key);
                }
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok((total, sample))
    }

    async fn domain_summary(
        &self,
        conn: &mut ConnectionManager,
        domain: CacheDomain,
    ) -> crate::Result<DomainSummary> {
        let pattern = format!("{}:{}:*", self.namespace, domain.as_str());
        let (total, sample) = self.scan_count(conn, &pattern).await?;

        let mut sampled = 0u64;
        let mut sampled_expired = 0u64;
        let mut sampled_bytes = 0u64;
        for key in &sample {
            let raw: Option<String> = conn.get(key).await?;
            if let Some(raw) = raw {
                sampled += 1;
                sampled_bytes += raw.len() as u64;
                match serde_json::from_str::<CacheEntry>(&raw) {
                    Ok(entry) if entry.is_expired() => sampled_expired += 1,
                    Ok(_) => {}
                    // Undecodable records count as expired: they will read
                    // as misses forever and only server expiry removes them.
                    Err(_) => sampled_expired += 1,
                }
            }
        }

        // Extrapolate the sampled ratios to the full domain.
        let expired = if sampled > 0 {
            total * sampled_expired / sampled
        } else {
            0
        };
        Ok(DomainSummary {
            total,
            active: total.saturating_sub(expired),
            expired,
            approx_entry_bytes: if sampled > 0 { sampled_bytes / sampled } else { 0 },
        })
    }
}

#[async_trait]
impl DurableStore for RedisStore {
    async fn connect(&self) {
        let client = match redis::Client::open(self.url.as_str()) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "invalid durable store connection string; durable tier disabled");
                return;
            }
        };
        match tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client)).await {
            Ok(Ok(manager)) => {
                *self.conn.write().expect("connection lock poisoned") = Some(manager);
                info!(namespace = %self.namespace, "durable cache connected");
            }
            Ok(Err(e)) => {
                warn!(error = %e, "durable cache connection failed; continuing without it");
            }
            Err(_) => {
                warn!("durable cache connection timed out; continuing without it");
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.conn
            .read()
            .expect("connection lock poisoned")
            .is_some()
    }

    async fn get(&self, domain: CacheDomain, key: &str) -> Option<CacheEntry> {
        let mut conn = self.connection()?;
        let redis_key = self.redis_key(key);

        let raw = self
            .guard("get", self.op_timeout, async {
                let raw: Option<String> = conn.get(&redis_key).await?;
                Ok(raw)
            })
            .await??;

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(domain = %domain, key, error = %e, "discarding undecodable durable entry");
                let mut conn = self.connection()?;
                let redis_key = self.redis_key(key);
                let _ = self
                    .guard("del", self.op_timeout, async move {
                        let _: u64 = conn.del(&redis_key).await?;
                        Ok(())
                    })
                    .await;
                return None;
            }
        };

        if entry.is_expired() {
            // Server-side expiry hasn't collected it yet; do so lazily.
            debug!(domain = %domain, key, "durable entry expired on read");
            let mut conn = self.connection()?;
            let redis_key = self.redis_key(key);
            let _ = self
                .guard("del", self.op_timeout, async move {
                    let _: u64 = conn.del(&redis_key).await?;
                    Ok(())
                })
                .await;
            return None;
        }
        Some(entry)
    }

    async fn set(&self, domain: CacheDomain, key: &str, entry: &CacheEntry) {
        let Some(mut conn) = self.connection() else {
            return;
        };
        // Server-side expiry mirrors the envelope's remaining lifetime. An
        // already-expired entry is not worth a round trip.
        let Some(remaining) = entry.remaining_ttl() else {
            return;
        };
        let seconds = remaining.as_secs().max(1);
        let raw = match serde_json::to_string(entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(domain = %domain, key, error = %e, "unserializable cache entry; skipping durable write");
                return;
            }
        };
        let redis_key = self.redis_key(key);
        let _ = self
            .guard("set", self.op_timeout, async move {
                let _: () = conn.set_ex(&redis_key, raw, seconds).await?;
                Ok(())
            })
            .await;
    }

    async fn clear_by_prefix(&self, domain: CacheDomain, prefix: &str) -> u64 {
        let Some(mut conn) = self.connection() else {
            return 0;
        };
        let pattern = format!("{}:{}*", self.namespace, prefix);
        let budget = self.op_timeout.saturating_mul(BULK_TIMEOUT_MULT);
        let removed = self
            .guard("clear_by_prefix", budget, async {
                self.scan_delete(&mut conn, &pattern).await
            })
            .await
            .unwrap_or(0);
        debug!(domain = %domain, prefix, removed, "durable prefix clear");
        removed
    }

    async fn clear_all(&self) -> u64 {
        let mut removed = 0u64;
        for domain in CacheDomain::ALL {
            removed += self
                .clear_by_prefix(domain, &format!("{}:", domain.as_str()))
                .await;
        }
        removed
    }

    async fn summary(&self) -> Option<DurableSummary> {
        let mut conn = self.connection()?;
        let budget = self.op_timeout.saturating_mul(BULK_TIMEOUT_MULT);
        self.guard("summary", budget, async {
            let mut per_domain = BTreeMap::new();
            for domain in CacheDomain::ALL {
                let summary = self.domain_summary(&mut conn, domain).await?;
                per_domain.insert(domain.as_str().to_string(), summary);
            }
            Ok(DurableSummary { per_domain })
        })
        .await
    }
}
