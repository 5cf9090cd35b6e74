//! Change-feed-driven cache invalidation.
//!
//! The [`InvalidationService`] keeps cached entries from drifting too far
//! from upstream truth without ever flushing the whole cache. On a fixed
//! interval (and once shortly after startup) it asks the upstream
//! [`ChangeFeed`] for everything changed since its checkpoint, maps each
//! record to the narrowest set of `(domain, prefix)` targets via the
//! fixed table in [`targets`], and clears those from both tiers.
//!
//! # Checkpointing
//!
//! The checkpoint only advances after a *successful* fetch, and each
//! query reaches back an extra overlap window to tolerate clock skew and
//! late-arriving records. A failed fetch leaves the checkpoint alone so
//! the next tick re-covers the same window — changes are processed at
//! least once, never skipped.

pub mod feed;
pub mod targets;

pub use feed::{ChangeFeed, ChangeKind, ChangeRecord};
pub use targets::{InvalidationTarget, targets_for};

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Deserialize;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::domain::CacheDomain;
use crate::manager::CacheManager;
use crate::Result;
use crate::telemetry;

/// Invalidation service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidationConfig {
    /// Interval between change-feed checks (default: 12 h).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Delay before the first check after startup (default: 1 min).
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
    /// Safety overlap subtracted from the checkpoint on every query
    /// (default: 10 min).
    #[serde(default = "default_overlap")]
    pub overlap_secs: u64,
    /// Domain cleared wholesale for unattributable records (default:
    /// `search`, the most volatile domain). The upstream feed documents
    /// no contract for unknown shapes, so the blast radius is a
    /// deployment choice.
    #[serde(default = "default_fallback_domain")]
    pub fallback_domain: String,
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            initial_delay_secs: default_initial_delay(),
            overlap_secs: default_overlap(),
            fallback_domain: default_fallback_domain(),
        }
    }
}

fn default_poll_interval() -> u64 {
    12 * 3600
}

fn default_initial_delay() -> u64 {
    60
}

fn default_overlap() -> u64 {
    600
}

fn default_fallback_domain() -> String {
    "search".to_string()
}

impl InvalidationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    /// The configured fallback domain; an unparseable value warns and
    /// falls back to `search`.
    pub fn fallback_domain(&self) -> CacheDomain {
        match self.fallback_domain.parse() {
            Ok(domain) => domain,
            Err(_) => {
                warn!(
                    configured = %self.fallback_domain,
                    "invalid fallback domain; using search"
                );
                CacheDomain::Search
            }
        }
    }
}

/// Snapshot of the service's state for operational inspection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InvalidationStatus {
    pub running: bool,
    pub last_checkpoint: DateTime<Utc>,
    /// Time until the next scheduled check, `None` before the loop
    /// starts or after it stops.
    pub next_check_in: Option<Duration>,
}

/// Result of one change-feed check.
#[derive(Debug, Clone, Copy)]
pub struct CheckOutcome {
    pub records: usize,
    pub entries_removed: u64,
}

struct FeedState {
    last_checkpoint: DateTime<Utc>,
    next_check_at: Option<DateTime<Utc>>,
}

/// Background service polling the upstream change feed and evicting
/// affected cache entries.
pub struct InvalidationService {
    cache: Arc<CacheManager>,
    feed: Arc<dyn ChangeFeed>,
    config: InvalidationConfig,
    fallback: CacheDomain,
    state: Mutex<FeedState>,
    running: AtomicBool,
    stop: Notify,
}

impl InvalidationService {
    /// Create the service with its checkpoint initialized to now —
    /// history before service start is the TTLs' problem, not the feed's.
    pub fn new(
        cache: Arc<CacheManager>,
        feed: Arc<dyn ChangeFeed>,
        config: InvalidationConfig,
    ) -> Arc<Self> {
        let fallback = config.fallback_domain();
        Arc::new(Self {
            cache,
            feed,
            config,
            fallback,
            state: Mutex::new(FeedState {
                last_checkpoint: Utc::now(),
                next_check_at: None,
            }),
            running: AtomicBool::new(false),
            stop: Notify::new(),
        })
    }

    /// Start the tick loop: initial delay, then check + sleep forever.
    /// A failed check is logged and retried on the next tick; nothing
    /// here is fatal to the hosting process.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        service.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            if service.sleep_or_stop(service.config.initial_delay()).await {
                service.running.store(false, Ordering::SeqCst);
                return;
            }
            loop {
                // errors are logged inside; the loop only cares about pacing
                let _ = service.check_now().await;
                if service.sleep_or_stop(service.config.poll_interval()).await {
                    break;
                }
            }
            service.running.store(false, Ordering::SeqCst);
            info!("invalidation service stopped");
        })
    }

    /// Request an orderly stop. The loop exits at its next suspension
    /// point; an in-flight check finishes first.
    pub fn stop(&self) {
        self.stop.notify_one();
    }

    /// Sleep for `delay`, returning `true` if a stop was requested.
    async fn sleep_or_stop(&self, delay: Duration) -> bool {
        self.set_next_check(Some(Utc::now() + chrono::Duration::seconds(delay.as_secs() as i64)));
        let stopped = tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = self.stop.notified() => true,
        };
        if stopped {
            self.set_next_check(None);
        }
        stopped
    }

    fn set_next_check(&self, at: Option<DateTime<Utc>>) {
        self.state.lock().expect("state lock poisoned").next_check_at = at;
    }

    /// Run one check immediately — the manual out-of-band trigger, also
    /// used by the tick loop.
    ///
    /// On success the checkpoint advances to the time the fetch started
    /// (not finished), so records arriving mid-processing land inside the
    /// next window. On failure the checkpoint is untouched.
    pub async fn check_now(&self) -> Result<CheckOutcome> {
        let fetch_started = Utc::now();
        let since = {
            let state = self.state.lock().expect("state lock poisoned");
            state.last_checkpoint - chrono::Duration::seconds(self.config.overlap_secs as i64)
        };

        let records = match self.feed.changes_since(since).await {
            Ok(records) => {
                metrics::counter!(telemetry::FEED_CHECKS_TOTAL, "status" => "ok").increment(1);
                records
            }
            Err(e) => {
                metrics::counter!(telemetry::FEED_CHECKS_TOTAL, "status" => "error").increment(1);
                warn!(error = %e, "change feed fetch failed; checkpoint unchanged");
                return Err(e);
            }
        };

        let mut entries_removed = 0u64;
        for record in &records {
            if matches!(record.kind, ChangeKind::Other(_)) || record.id.is_none() {
                warn!(?record, "unattributable change record; applying fallback invalidation");
            }
            // Targets of one record are independent; clear them concurrently.
            let cleared = join_all(targets_for(record, self.fallback).into_iter().map(
                |target| async move {
                    let removed = self
                        .cache
                        .clear_by_prefix(target.domain, &target.prefix)
                        .await;
                    metrics::counter!(
                        telemetry::ENTRIES_INVALIDATED_TOTAL,
                        "domain" => target.domain.as_str()
                    )
                    .increment(removed);
                    removed
                },
            ))
            .await;
            entries_removed += cleared.into_iter().sum::<u64>();
        }

        self.state
            .lock()
            .expect("state lock poisoned")
            .last_checkpoint = fetch_started;

        info!(
            records = records.len(),
            entries_removed, "change feed processed"
        );
        Ok(CheckOutcome {
            records: records.len(),
            entries_removed,
        })
    }

    /// Operational snapshot: running flag, checkpoint, countdown.
    pub fn status(&self) -> InvalidationStatus {
        let state = self.state.lock().expect("state lock poisoned");
        InvalidationStatus {
            running: self.running.load(Ordering::SeqCst),
            last_checkpoint: state.last_checkpoint,
            next_check_in: state
                .next_check_at
                .and_then(|at| (at - Utc::now()).to_std().ok()),
        }
    }
}
