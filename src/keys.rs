//! Deterministic cache-key construction.
//!
//! Every key is composed from the logical lookup parameters (content kind,
//! id, language, sub-resource) so identical logical requests collide on the
//! same key, and always starts with its domain tag. Collaborators and the
//! invalidation service both build keys and prefixes through this module —
//! nothing else concatenates key strings by hand.
//!
//! Examples of the shapes produced:
//!
//! - `metadata:series:81189:eng`
//! - `search:series:eng:friends`
//! - `seasons:series:81189:eng`
//! - `validation:movie:603`
//! - `idmap:imdb:tt0903747`

use std::fmt;

/// The two content kinds the aggregation service serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Series,
    Movie,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Series => "series",
            ContentKind::Movie => "movie",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key for a per-title metadata record in a given language.
pub fn metadata(kind: ContentKind, id: u64, language: &str) -> String {
    format!("metadata:{kind}:{id}:{language}")
}

/// Prefix covering every language variant of a title's metadata.
pub fn metadata_prefix(kind: ContentKind, id: u64) -> String {
    format!("metadata:{kind}:{id}")
}

/// Key for a search-results page. The query is normalized (trimmed,
/// lowercased, inner whitespace collapsed) so trivially different spellings
/// of the same search share an entry.
pub fn search(kind: ContentKind, language: &str, query: &str) -> String {
    format!("search:{kind}:{language}:{}", normalize_query(query))
}

/// Key for a cross-reference validation result.
pub fn validation(kind: ContentKind, id: u64) -> String {
    format!("validation:{kind}:{id}")
}

/// Key for a title's artwork selection.
pub fn artwork(kind: ContentKind, id: u64) -> String {
    format!("artwork:{kind}:{id}")
}

/// Key for a title's translation record in a given language.
pub fn translation(kind: ContentKind, id: u64, language: &str) -> String {
    format!("translations:{kind}:{id}:{language}")
}

/// Prefix covering every language variant of a title's translations.
pub fn translation_prefix(kind: ContentKind, id: u64) -> String {
    format!("translations:{kind}:{id}")
}

/// Key for a series' season/episode listing in a given language.
pub fn seasons(series_id: u64, language: &str) -> String {
    format!("seasons:series:{series_id}:{language}")
}

/// Prefix covering every language variant of a series' listings.
pub fn seasons_prefix(series_id: u64) -> String {
    format!("seasons:series:{series_id}")
}

/// Key for an aggregated catalog page.
pub fn catalog(kind: ContentKind, language: &str, page: u32) -> String {
    format!("catalog:{kind}:{language}:{page}")
}

/// Key for an external-id mapping record (e.g. `idmap:imdb:tt0903747`).
pub fn idmap(provider: &str, external_id: &str) -> String {
    format!("idmap:{provider}:{external_id}")
}

/// Key for a negative (known-absent) result, derived from the key the
/// failed lookup would have populated.
pub fn negative(missed_key: &str) -> String {
    format!("negative:{missed_key}")
}

fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
