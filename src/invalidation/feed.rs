//! Change-feed boundary types.
//!
//! The upstream client (out of scope here) implements [`ChangeFeed`];
//! the invalidation service only consumes it. Record shapes follow the
//! upstream's incremental-updates endpoint: a kind, a record id, and a
//! parent id for sub-resources (episodes, seasons, artwork, translations).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::Result;

/// What kind of upstream record changed.
///
/// Unknown kinds deserialize to [`Other`](ChangeKind::Other) with the raw
/// string preserved, so a feed that grows new record shapes degrades to
/// the conservative fallback instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ChangeKind {
    Series,
    Movie,
    Episode,
    Season,
    Artwork,
    Translation,
    Other(String),
}

impl ChangeKind {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeKind::Series => "series",
            ChangeKind::Movie => "movie",
            ChangeKind::Episode => "episode",
            ChangeKind::Season => "season",
            ChangeKind::Artwork => "artwork",
            ChangeKind::Translation => "translation",
            ChangeKind::Other(raw) => raw,
        }
    }
}

impl From<String> for ChangeKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "series" => ChangeKind::Series,
            "movie" => ChangeKind::Movie,
            "episode" => ChangeKind::Episode,
            "season" => ChangeKind::Season,
            "artwork" => ChangeKind::Artwork,
            "translation" => ChangeKind::Translation,
            _ => ChangeKind::Other(raw),
        }
    }
}

/// One record from the upstream change feed.
///
/// `id` is optional because real feeds occasionally emit records without
/// one; the service treats those as malformed and falls back
/// conservatively rather than dropping them silently.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub parent_id: Option<u64>,
}

impl ChangeRecord {
    pub fn new(kind: ChangeKind, id: u64) -> Self {
        Self {
            kind,
            id: Some(id),
            parent_id: None,
        }
    }

    pub fn with_parent(kind: ChangeKind, id: u64, parent_id: u64) -> Self {
        Self {
            kind,
            id: Some(id),
            parent_id: Some(parent_id),
        }
    }
}

/// The upstream incremental-change feed.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// List every record changed upstream since `since`.
    ///
    /// Implementations surface transport failures as
    /// [`MuninnError::Feed`](crate::MuninnError::Feed); the service logs,
    /// keeps its checkpoint, and retries on the next tick.
    async fn changes_since(&self, since: DateTime<Utc>) -> Result<Vec<ChangeRecord>>;
}
