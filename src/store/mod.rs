//! Cache storage tiers.
//!
//! Two tiers behind one entry model:
//!
//! - [`MemoryStore`] — the fast tier. Process-local, synchronous, no I/O,
//!   no failure modes. Every read and write goes through it.
//!
//! - [`RedisStore`] — the optional durable tier, behind the
//!   [`DurableStore`] trait so the manager (and tests) never couple to the
//!   concrete backend. Network-bound, survives restarts, and degrades to
//!   always-miss/no-op whenever the connection is gone.
//!
//! The [`CacheManager`](crate::CacheManager) composes the tiers; nothing
//! else talks to them directly.

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::CacheDomain;
use crate::entry::CacheEntry;

/// Entry counts for an in-process tier, keyed by domain tag.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TierStats {
    pub total: u64,
    pub per_domain: BTreeMap<String, u64>,
}

/// Per-domain observability numbers for the durable tier.
///
/// `expired` counts entries that are physically present but logically dead
/// (server-side expiry hasn't collected them yet). Derived from a bounded
/// sample, so treat these as estimates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DomainSummary {
    pub total: u64,
    pub active: u64,
    pub expired: u64,
    pub approx_entry_bytes: u64,
}

/// Durable-tier summary across all domains.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DurableSummary {
    pub per_domain: BTreeMap<String, DomainSummary>,
}

/// The durable (L2) tier contract.
///
/// Implementations must never propagate I/O failures: a broken backend
/// reads as a miss, writes as a no-op, clears as zero removals. The
/// manager relies on this to keep the request path failure-free.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Establish the backend connection once at startup. On failure the
    /// store logs and remains disconnected; it never retries here.
    async fn connect(&self);

    /// Whether the backend connection was established.
    fn is_connected(&self) -> bool;

    /// Fetch an entry. `None` if absent, expired, unreachable, or
    /// undecodable.
    async fn get(&self, domain: CacheDomain, key: &str) -> Option<CacheEntry>;

    /// Upsert an entry. Best-effort; failures are logged and dropped.
    async fn set(&self, domain: CacheDomain, key: &str, entry: &CacheEntry);

    /// Delete every key in `domain` starting with `prefix`. Returns the
    /// number of deleted records (0 when unreachable).
    async fn clear_by_prefix(&self, domain: CacheDomain, prefix: &str) -> u64;

    /// Delete every record in every domain. Returns the number deleted.
    async fn clear_all(&self) -> u64;

    /// Per-domain observability summary, `None` when unreachable.
    async fn summary(&self) -> Option<DurableSummary>;
}
