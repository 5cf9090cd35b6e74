//! Cache construction: topology selection and wiring.
//!
//! Topology is a startup-only decision — there is no runtime switching.
//! [`Muninn::builder()`] is the programmatic entry point;
//! [`from_config`] maps deployment configuration onto it and owns the
//! startup lifecycle (durable connect, sweeper spawn).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::config::{MuninnConfig, TtlConfig};
use crate::manager::{CacheManager, DEFAULT_WRITE_QUEUE};
use crate::store::{DurableStore, RedisStore};
use crate::{MuninnError, Result};

/// Which tiers to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTopology {
    /// Fast tier only.
    #[default]
    Memory,
    /// Fast tier backed by the durable tier.
    #[serde(alias = "durable")]
    Hybrid,
}

impl FromStr for CacheTopology {
    type Err = MuninnError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(CacheTopology::Memory),
            "hybrid" | "durable" => Ok(CacheTopology::Hybrid),
            other => Err(MuninnError::Configuration(format!(
                "unknown cache topology: {other}"
            ))),
        }
    }
}

/// Main entry point for constructing cache instances.
pub struct Muninn;

impl Muninn {
    /// Create a new builder for configuring the cache.
    pub fn builder() -> MuninnBuilder {
        MuninnBuilder::new()
    }
}

/// Builder for configuring cache instances.
pub struct MuninnBuilder {
    topology: CacheTopology,
    redis_url: Option<String>,
    namespace: String,
    ttl: TtlConfig,
    write_queue: usize,
    op_timeout: Duration,
}

impl MuninnBuilder {
    pub fn new() -> Self {
        Self {
            topology: CacheTopology::Memory,
            redis_url: None,
            namespace: "muninn".to_string(),
            ttl: TtlConfig::default(),
            write_queue: DEFAULT_WRITE_QUEUE,
            op_timeout: Duration::from_secs(2),
        }
    }

    /// Request hybrid topology backed by the given connection string.
    pub fn durable(mut self, url: impl Into<String>) -> Self {
        self.topology = CacheTopology::Hybrid;
        self.redis_url = Some(url.into());
        self
    }

    /// Set the topology explicitly (normally implied by [`durable`](Self::durable)).
    pub fn topology(mut self, topology: CacheTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the durable-store key namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the per-domain TTL policy.
    pub fn ttl(mut self, ttl: TtlConfig) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the durable write queue capacity.
    pub fn write_queue(mut self, capacity: usize) -> Self {
        self.write_queue = capacity;
        self
    }

    /// Set the per-call durable operation budget.
    pub fn op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Build the manager. Must be called within a tokio runtime when the
    /// topology is hybrid (the writer task is spawned here).
    ///
    /// Hybrid topology without a connection string downgrades to
    /// memory-only with a warning — a misconfigured deployment serves
    /// traffic slower, it does not refuse to start.
    pub fn build(self) -> Arc<CacheManager> {
        match self.topology {
            CacheTopology::Memory => Arc::new(CacheManager::memory_only(self.ttl)),
            CacheTopology::Hybrid => match self.redis_url {
                Some(url) => {
                    let store: Arc<dyn DurableStore> =
                        Arc::new(RedisStore::new(url, self.namespace, self.op_timeout));
                    Arc::new(CacheManager::with_durable(self.ttl, store, self.write_queue))
                }
                None => {
                    warn!(
                        "hybrid cache requested but no durable connection string configured; \
                         falling back to memory-only"
                    );
                    Arc::new(CacheManager::memory_only(self.ttl))
                }
            },
        }
    }
}

impl Default for MuninnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Construct the cache from deployment configuration and run its startup
/// lifecycle: connect the durable tier (if any) and spawn the periodic
/// fast-tier sweeper.
pub async fn from_config(config: &MuninnConfig) -> Arc<CacheManager> {
    let mut builder = Muninn::builder()
        .topology(config.topology)
        .namespace(config.namespace.clone())
        .ttl(config.ttl.clone())
        .write_queue(config.write_queue_size)
        .op_timeout(config.durable_op_timeout());
    // A connection string only matters in hybrid topology; build()
    // reports the downgrade when hybrid was requested without one.
    if config.topology == CacheTopology::Hybrid
        && let Some(url) = &config.redis_url
    {
        builder = builder.durable(url.clone());
    }

    let manager = builder.build();
    manager.connect().await;
    let _ = manager.spawn_sweeper(config.sweep_interval());
    manager
}
