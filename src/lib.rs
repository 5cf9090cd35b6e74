//! Muninn - tiered metadata cache with change-feed driven invalidation
//!
//! This crate is the caching layer of a metadata aggregation service: it
//! stores the results of expensive, rate-limited upstream lookups (search,
//! per-title metadata, artwork, translations, cross-reference mappings) in
//! a fast in-process tier backed by an optional Redis durable tier, and
//! keeps cached data fresh by consuming an upstream incremental-change
//! feed and evicting only the entries each change affects.
//!
//! # Cache Example
//!
//! ```rust,no_run
//! use muninn::{ContentKind, Muninn};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Muninn::builder()
//!         .durable("redis://localhost:6379")
//!         .build();
//!     cache.connect().await;
//!
//!     cache.set_metadata(
//!         ContentKind::Series,
//!         81189,
//!         "eng",
//!         serde_json::json!({"name": "Breaking Bad"}),
//!     );
//!     let hit = cache.get_metadata(ContentKind::Series, 81189, "eng").await;
//!     assert!(hit.is_some());
//!
//!     let _ = cache.spawn_sweeper(Duration::from_secs(300));
//! }
//! ```
//!
//! # Invalidation Example
//!
//! ```rust,ignore
//! use muninn::{InvalidationConfig, InvalidationService};
//!
//! // `feed` is the upstream client's ChangeFeed implementation.
//! let service = InvalidationService::new(cache, feed, InvalidationConfig::default());
//! let handle = service.spawn();
//! ```

pub mod coalesce;
pub mod config;
pub mod domain;
pub mod entry;
pub mod error;
pub mod factory;
pub mod invalidation;
pub mod keys;
pub mod manager;
pub mod store;
pub mod telemetry;

// Re-export main types at crate root
pub use error::{MuninnError, Result};
pub use factory::{CacheTopology, Muninn, MuninnBuilder};
pub use manager::{CacheManager, CacheStats, DEFAULT_WRITE_QUEUE};

// Re-export the model and boundary types
pub use coalesce::FetchCoalescer;
pub use config::{MuninnConfig, TtlConfig};
pub use domain::CacheDomain;
pub use entry::CacheEntry;
pub use invalidation::{
    ChangeFeed, ChangeKind, ChangeRecord, CheckOutcome, InvalidationConfig, InvalidationService,
    InvalidationStatus, InvalidationTarget,
};
pub use keys::ContentKind;
pub use store::{
    DomainSummary, DurableStore, DurableSummary, MemoryStore, RedisStore, TierStats,
};
