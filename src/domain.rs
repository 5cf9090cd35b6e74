//! Cache domains — named partitions of the key space.
//!
//! Every cached value belongs to exactly one [`CacheDomain`]. Domains never
//! share keys, and each carries its own TTL policy (configured in
//! [`TtlConfig`](crate::config::TtlConfig), applied at write time). The set
//! is closed: collaborators pick a domain, they never invent one.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{MuninnError, Result};

/// A named partition of the cache key space.
///
/// Listed in descending volatility order. The default TTLs (see
/// [`default_ttl`](Self::default_ttl)) follow the same ordering: search
/// results go stale in hours, artwork survives for weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheDomain {
    /// Upstream search results for a query string.
    Search,
    /// Cross-reference validation results (does this external id resolve?).
    Validation,
    /// Artwork lookups (posters, backgrounds, logos).
    Artwork,
    /// Per-title translation records.
    Translations,
    /// Per-title metadata.
    Metadata,
    /// Season and episode listings for a series.
    Seasons,
    /// Aggregated catalog pages.
    Catalog,
    /// External-id to canonical-id mapping records.
    IdMap,
    /// Negative results: known absence of valid upstream data.
    Negative,
}

impl CacheDomain {
    /// All domains, in declaration order. Used by sweeps, stats, and
    /// full-cache clears.
    pub const ALL: [CacheDomain; 9] = [
        CacheDomain::Search,
        CacheDomain::Validation,
        CacheDomain::Artwork,
        CacheDomain::Translations,
        CacheDomain::Metadata,
        CacheDomain::Seasons,
        CacheDomain::Catalog,
        CacheDomain::IdMap,
        CacheDomain::Negative,
    ];

    /// The domain's key-space tag. Doubles as the first segment of every
    /// key in the domain (`search:...`, `metadata:...`).
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheDomain::Search => "search",
            CacheDomain::Validation => "validation",
            CacheDomain::Artwork => "artwork",
            CacheDomain::Translations => "translations",
            CacheDomain::Metadata => "metadata",
            CacheDomain::Seasons => "seasons",
            CacheDomain::Catalog => "catalog",
            CacheDomain::IdMap => "idmap",
            CacheDomain::Negative => "negative",
        }
    }

    /// Default time-to-live for entries written to this domain.
    pub fn default_ttl(&self) -> Duration {
        const HOUR: u64 = 3600;
        const DAY: u64 = 24 * HOUR;
        match self {
            CacheDomain::Search => Duration::from_secs(2 * HOUR),
            CacheDomain::Validation => Duration::from_secs(7 * DAY),
            CacheDomain::Artwork => Duration::from_secs(14 * DAY),
            CacheDomain::Translations => Duration::from_secs(3 * DAY),
            CacheDomain::Metadata => Duration::from_secs(12 * HOUR),
            CacheDomain::Seasons => Duration::from_secs(6 * HOUR),
            CacheDomain::Catalog => Duration::from_secs(DAY),
            CacheDomain::IdMap => Duration::from_secs(7 * DAY),
            CacheDomain::Negative => Duration::from_secs(HOUR),
        }
    }
}

impl fmt::Display for CacheDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheDomain {
    type Err = MuninnError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "search" => Ok(CacheDomain::Search),
            "validation" => Ok(CacheDomain::Validation),
            "artwork" => Ok(CacheDomain::Artwork),
            "translations" => Ok(CacheDomain::Translations),
            "metadata" => Ok(CacheDomain::Metadata),
            "seasons" => Ok(CacheDomain::Seasons),
            "catalog" => Ok(CacheDomain::Catalog),
            "idmap" => Ok(CacheDomain::IdMap),
            "negative" => Ok(CacheDomain::Negative),
            other => Err(MuninnError::Configuration(format!(
                "unknown cache domain: {other}"
            ))),
        }
    }
}
