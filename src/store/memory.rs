//! The fast (L1) tier: process-local, zero-I/O storage.

use std::collections::BTreeMap;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;

use super::TierStats;
use crate::domain::CacheDomain;
use crate::entry::CacheEntry;

/// In-process cache tier: one concurrent map per domain.
///
/// Expiry is lazy — a read that finds a dead entry removes it and reports
/// a miss — plus the periodic [`sweep_expired`](Self::sweep_expired) pass
/// that collects entries nobody re-reads. All operations are synchronous
/// and infallible; sharded maps keep clears and sweeps from blocking
/// concurrent readers behind a whole-store lock.
pub struct MemoryStore {
    // Indexed by `CacheDomain as usize`; the enum is C-like and
    // `CacheDomain::ALL` shares its declaration order.
    domains: [DashMap<String, CacheEntry>; CacheDomain::ALL.len()],
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            domains: std::array::from_fn(|_| DashMap::new()),
        }
    }

    fn slot(&self, domain: CacheDomain) -> &DashMap<String, CacheEntry> {
        &self.domains[domain as usize]
    }

    /// Look up a payload. Misses on absent or expired entries; an expired
    /// entry is removed on the way out.
    pub fn get(&self, domain: CacheDomain, key: &str) -> Option<Value> {
        let map = self.slot(domain);
        match map.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.payload.clone()),
            Some(_) => {}
            None => return None,
        }
        // Lazy expiry. Re-check under the removal lock: a concurrent
        // overwrite may have refreshed the key since the read above.
        map.remove_if(key, |_, entry| entry.is_expired());
        None
    }

    /// Insert or overwrite, expiring `ttl` from now. Always succeeds.
    pub fn set(&self, domain: CacheDomain, key: impl Into<String>, payload: Value, ttl: Duration) {
        self.insert(domain, key, CacheEntry::new(payload, ttl));
    }

    /// Insert a pre-built entry, preserving its original timestamps.
    /// Promotion from the durable tier uses this so the promoted copy
    /// keeps the write-time expiry.
    pub fn insert(&self, domain: CacheDomain, key: impl Into<String>, entry: CacheEntry) {
        self.slot(domain).insert(key.into(), entry);
    }

    /// Remove every key in `domain` starting with `prefix`.
    pub fn clear_by_prefix(&self, domain: CacheDomain, prefix: &str) -> u64 {
        let mut removed = 0u64;
        self.slot(domain).retain(|key, _| {
            if key.starts_with(prefix) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Empty every domain.
    pub fn clear_all(&self) -> u64 {
        let mut removed = 0u64;
        for map in &self.domains {
            removed += map.len() as u64;
            map.clear();
        }
        removed
    }

    /// Remove physically expired entries across all domains. Runs shard by
    /// shard, so concurrent reads and writes proceed during the sweep.
    pub fn sweep_expired(&self) -> u64 {
        let mut removed = 0u64;
        for map in &self.domains {
            map.retain(|_, entry| {
                if entry.is_expired() {
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        removed
    }

    /// Per-domain entry counts. Counts include physically-present expired
    /// entries; the sweep keeps the drift bounded.
    pub fn stats(&self) -> TierStats {
        let mut per_domain = BTreeMap::new();
        let mut total = 0u64;
        for domain in CacheDomain::ALL {
            let count = self.slot(domain).len() as u64;
            total += count;
            per_domain.insert(domain.as_str().to_string(), count);
        }
        TierStats { total, per_domain }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
