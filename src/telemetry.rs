//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `domain` — cache domain (e.g. "search", "metadata")
//! - `tier` — cache tier: "fast" or "durable"
//! - `operation` — durable-store operation (e.g. "get", "set", "clear")
//! - `status` — outcome: "ok" or "error"

/// Total cache hits.
///
/// Labels: `domain`, `tier` ("fast" | "durable").
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total cache misses (both tiers missed, or the only tier missed).
///
/// Labels: `domain`.
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Total cache writes accepted by the fast tier.
///
/// Labels: `domain`.
pub const CACHE_WRITES_TOTAL: &str = "muninn_cache_writes_total";

/// Durable writes dropped because the write queue was full.
///
/// Labels: `domain`.
pub const WRITE_QUEUE_DROPS_TOTAL: &str = "muninn_write_queue_drops_total";

/// Durable-store operations that failed or timed out and degraded to a
/// miss/no-op.
///
/// Labels: `operation`.
pub const DURABLE_ERRORS_TOTAL: &str = "muninn_durable_errors_total";

/// Entries removed by targeted invalidation (both tiers combined).
///
/// Labels: `domain`.
pub const ENTRIES_INVALIDATED_TOTAL: &str = "muninn_entries_invalidated_total";

/// Change-feed checks performed by the invalidation service.
///
/// Labels: `status` ("ok" | "error").
pub const FEED_CHECKS_TOTAL: &str = "muninn_feed_checks_total";

/// Expired entries removed by the periodic fast-tier sweep.
pub const SWEEP_REMOVED_TOTAL: &str = "muninn_sweep_removed_total";

/// Upstream loads coalesced onto an already-in-flight fetch.
pub const COALESCED_FETCHES_TOTAL: &str = "muninn_coalesced_fetches_total";
