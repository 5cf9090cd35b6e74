//! Muninn error types

/// Muninn error types
///
/// Durable-store failures never reach the public read/write path — the
/// store catches them and degrades to a miss or a dropped write. The
/// variants below cover the surfaces that legitimately fail: construction,
/// the change feed, and coalesced upstream loads.
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Change feed errors
    #[error("change feed error: {0}")]
    Feed(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal redis failure. Converted to a miss/no-op at the durable
    /// store boundary; callers of the cache API never observe it.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// An upstream load executed under the fetch coalescer failed.
    #[error("upstream fetch failed: {0}")]
    Upstream(String),
}

/// Result type alias for muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
