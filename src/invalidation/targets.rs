//! The fixed mapping from change records to invalidation targets.
//!
//! Each upstream change maps to the narrowest set of `(domain, prefix)`
//! pairs that could hold stale data for it. The table errs toward
//! precision: a series change touches that series' domains only, an
//! episode change touches only its parent's season listings, and a shape
//! we cannot attribute clears a single configurable fallback domain —
//! never the whole cache.

use super::feed::{ChangeKind, ChangeRecord};
use crate::domain::CacheDomain;
use crate::keys::{self, ContentKind};

/// One prefix to clear in one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationTarget {
    pub domain: CacheDomain,
    pub prefix: String,
}

impl InvalidationTarget {
    fn new(domain: CacheDomain, prefix: String) -> Self {
        Self { domain, prefix }
    }
}

/// Map a change record to its invalidation targets.
///
/// `fallback` is the domain cleared wholesale for records the table
/// cannot attribute (unknown kind, missing id, sub-resource without a
/// parent).
pub fn targets_for(record: &ChangeRecord, fallback: CacheDomain) -> Vec<InvalidationTarget> {
    let Some(id) = record.id else {
        return fallback_targets(fallback);
    };

    match &record.kind {
        ChangeKind::Series => {
            let kind = ContentKind::Series;
            vec![
                InvalidationTarget::new(CacheDomain::Metadata, keys::metadata_prefix(kind, id)),
                InvalidationTarget::new(CacheDomain::Validation, keys::validation(kind, id)),
                InvalidationTarget::new(CacheDomain::Artwork, keys::artwork(kind, id)),
                InvalidationTarget::new(
                    CacheDomain::Translations,
                    keys::translation_prefix(kind, id),
                ),
                InvalidationTarget::new(CacheDomain::Seasons, keys::seasons_prefix(id)),
            ]
        }
        ChangeKind::Movie => {
            let kind = ContentKind::Movie;
            vec![
                InvalidationTarget::new(CacheDomain::Metadata, keys::metadata_prefix(kind, id)),
                InvalidationTarget::new(CacheDomain::Validation, keys::validation(kind, id)),
                InvalidationTarget::new(CacheDomain::Artwork, keys::artwork(kind, id)),
                InvalidationTarget::new(
                    CacheDomain::Translations,
                    keys::translation_prefix(kind, id),
                ),
            ]
        }
        // Episode and season edits only move the parent series' listings;
        // the series' own metadata is untouched upstream.
        ChangeKind::Episode | ChangeKind::Season => match record.parent_id {
            Some(parent) => vec![InvalidationTarget::new(
                CacheDomain::Seasons,
                keys::seasons_prefix(parent),
            )],
            None => fallback_targets(fallback),
        },
        // The feed carries the parent id but not the parent's kind, so
        // cover both; still far narrower than a domain flush.
        ChangeKind::Artwork => match record.parent_id {
            Some(parent) => vec![
                InvalidationTarget::new(
                    CacheDomain::Artwork,
                    keys::artwork(ContentKind::Series, parent),
                ),
                InvalidationTarget::new(
                    CacheDomain::Artwork,
                    keys::artwork(ContentKind::Movie, parent),
                ),
            ],
            None => fallback_targets(fallback),
        },
        ChangeKind::Translation => match record.parent_id {
            Some(parent) => vec![
                InvalidationTarget::new(
                    CacheDomain::Translations,
                    keys::translation_prefix(ContentKind::Series, parent),
                ),
                InvalidationTarget::new(
                    CacheDomain::Translations,
                    keys::translation_prefix(ContentKind::Movie, parent),
                ),
            ],
            None => fallback_targets(fallback),
        },
        ChangeKind::Other(_) => fallback_targets(fallback),
    }
}

fn fallback_targets(fallback: CacheDomain) -> Vec<InvalidationTarget> {
    vec![InvalidationTarget::new(
        fallback,
        format!("{}:", fallback.as_str()),
    )]
}
