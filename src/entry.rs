//! The cache entry envelope shared by both tiers.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A single cached value plus the metadata both tiers need to enforce
/// expiry independently.
///
/// The payload is opaque: the cache never inspects or mutates it. The
/// envelope serializes as JSON because the durable tier stores it verbatim;
/// the fast tier keeps it as-is in memory.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry {
    /// Opaque serialized value. Owned by the collaborator that wrote it.
    pub payload: serde_json::Value,
    /// Wall-clock write time.
    pub created_at: DateTime<Utc>,
    /// Wall-clock expiry: `created_at + ttl`, fixed at write time.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry expiring `ttl` from now.
    pub fn new(payload: serde_json::Value, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self::from_parts(payload, created_at, ttl)
    }

    /// Create an entry with an explicit creation time. TTLs too large to
    /// represent saturate to the far future.
    pub fn from_parts(
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            payload,
            created_at,
            expires_at,
        }
    }

    /// Whether the entry is logically dead. Readers must treat an expired
    /// entry as a miss even if it is still physically present.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Time left before expiry, or `None` if already expired.
    ///
    /// Promotion from the durable tier uses this so a promoted copy never
    /// outlives the original write's expiry.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        (self.expires_at - Utc::now()).to_std().ok()
    }
}
