//! Configuration for cache topology, TTL policy, and background services.
//!
//! Config structs deserialize from the host's config file (TOML or any
//! serde format) with every field defaulted, so an empty table is a valid
//! configuration. [`MuninnConfig::from_env`] builds the same structure
//! from `MUNINN_*` environment variables for deployments that configure
//! through the environment.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::CacheDomain;
use crate::factory::CacheTopology;
use crate::invalidation::InvalidationConfig;
use crate::manager::DEFAULT_WRITE_QUEUE;

/// Top-level cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MuninnConfig {
    /// Cache topology: `memory` (default) or `hybrid`/`durable`.
    #[serde(default)]
    pub topology: CacheTopology,
    /// Durable-store connection string. Required for hybrid topology;
    /// hybrid without it downgrades to memory-only with a warning.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Key namespace prefix in the durable store (default: `muninn`).
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Capacity of the fire-and-forget durable write queue.
    #[serde(default = "default_write_queue")]
    pub write_queue_size: usize,
    /// Interval of the periodic fast-tier expiry sweep (default: 5 min).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Per-call budget for durable-store operations (default: 2 s).
    #[serde(default = "default_op_timeout")]
    pub durable_op_timeout_ms: u64,
    #[serde(default)]
    pub ttl: TtlConfig,
    #[serde(default)]
    pub invalidation: InvalidationConfig,
}

impl Default for MuninnConfig {
    fn default() -> Self {
        Self {
            topology: CacheTopology::default(),
            redis_url: None,
            namespace: default_namespace(),
            write_queue_size: default_write_queue(),
            sweep_interval_secs: default_sweep_interval(),
            durable_op_timeout_ms: default_op_timeout(),
            ttl: TtlConfig::default(),
            invalidation: InvalidationConfig::default(),
        }
    }
}

fn default_namespace() -> String {
    "muninn".to_string()
}

fn default_write_queue() -> usize {
    DEFAULT_WRITE_QUEUE
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_op_timeout() -> u64 {
    2000
}

impl MuninnConfig {
    /// Build configuration from `MUNINN_*` environment variables,
    /// defaulting every unset value.
    ///
    /// Recognized variables: `MUNINN_CACHE_MODE`, `MUNINN_REDIS_URL`,
    /// `MUNINN_NAMESPACE`, `MUNINN_SWEEP_INTERVAL_SECS`,
    /// `MUNINN_POLL_INTERVAL_SECS`, `MUNINN_INITIAL_DELAY_SECS`,
    /// `MUNINN_FALLBACK_DOMAIN`. Unparseable values fall back to the
    /// default rather than failing startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(mode) = env::var("MUNINN_CACHE_MODE")
            && let Ok(topology) = mode.parse()
        {
            config.topology = topology;
        }
        config.redis_url = env::var("MUNINN_REDIS_URL").ok().filter(|v| !v.is_empty());
        if let Ok(namespace) = env::var("MUNINN_NAMESPACE")
            && !namespace.is_empty()
        {
            config.namespace = namespace;
        }
        if let Some(secs) = env_u64("MUNINN_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = secs;
        }
        if let Some(secs) = env_u64("MUNINN_POLL_INTERVAL_SECS") {
            config.invalidation.poll_interval_secs = secs;
        }
        if let Some(secs) = env_u64("MUNINN_INITIAL_DELAY_SECS") {
            config.invalidation.initial_delay_secs = secs;
        }
        if let Ok(domain) = env::var("MUNINN_FALLBACK_DOMAIN")
            && !domain.is_empty()
        {
            config.invalidation.fallback_domain = domain;
        }

        config
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn durable_op_timeout(&self) -> Duration {
        Duration::from_millis(self.durable_op_timeout_ms)
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Per-domain time-to-live policy, in seconds.
///
/// Applied at write time only: changing a TTL never retroactively alters
/// entries already written. Defaults come from
/// [`CacheDomain::default_ttl`], descending with domain volatility.
#[derive(Debug, Clone, Deserialize)]
pub struct TtlConfig {
    #[serde(default = "default_search_ttl")]
    pub search_secs: u64,
    #[serde(default = "default_validation_ttl")]
    pub validation_secs: u64,
    #[serde(default = "default_artwork_ttl")]
    pub artwork_secs: u64,
    #[serde(default = "default_translations_ttl")]
    pub translations_secs: u64,
    #[serde(default = "default_metadata_ttl")]
    pub metadata_secs: u64,
    #[serde(default = "default_seasons_ttl")]
    pub seasons_secs: u64,
    #[serde(default = "default_catalog_ttl")]
    pub catalog_secs: u64,
    #[serde(default = "default_idmap_ttl")]
    pub idmap_secs: u64,
    #[serde(default = "default_negative_ttl")]
    pub negative_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            search_secs: default_search_ttl(),
            validation_secs: default_validation_ttl(),
            artwork_secs: default_artwork_ttl(),
            translations_secs: default_translations_ttl(),
            metadata_secs: default_metadata_ttl(),
            seasons_secs: default_seasons_ttl(),
            catalog_secs: default_catalog_ttl(),
            idmap_secs: default_idmap_ttl(),
            negative_secs: default_negative_ttl(),
        }
    }
}

impl TtlConfig {
    /// The configured TTL for a domain.
    pub fn for_domain(&self, domain: CacheDomain) -> Duration {
        let secs = match domain {
            CacheDomain::Search => self.search_secs,
            CacheDomain::Validation => self.validation_secs,
            CacheDomain::Artwork => self.artwork_secs,
            CacheDomain::Translations => self.translations_secs,
            CacheDomain::Metadata => self.metadata_secs,
            CacheDomain::Seasons => self.seasons_secs,
            CacheDomain::Catalog => self.catalog_secs,
            CacheDomain::IdMap => self.idmap_secs,
            CacheDomain::Negative => self.negative_secs,
        };
        Duration::from_secs(secs)
    }
}

fn default_search_ttl() -> u64 {
    CacheDomain::Search.default_ttl().as_secs()
}

fn default_validation_ttl() -> u64 {
    CacheDomain::Validation.default_ttl().as_secs()
}

fn default_artwork_ttl() -> u64 {
    CacheDomain::Artwork.default_ttl().as_secs()
}

fn default_translations_ttl() -> u64 {
    CacheDomain::Translations.default_ttl().as_secs()
}

fn default_metadata_ttl() -> u64 {
    CacheDomain::Metadata.default_ttl().as_secs()
}

fn default_seasons_ttl() -> u64 {
    CacheDomain::Seasons.default_ttl().as_secs()
}

fn default_catalog_ttl() -> u64 {
    CacheDomain::Catalog.default_ttl().as_secs()
}

fn default_idmap_ttl() -> u64 {
    CacheDomain::IdMap.default_ttl().as_secs()
}

fn default_negative_ttl() -> u64 {
    CacheDomain::Negative.default_ttl().as_secs()
}
