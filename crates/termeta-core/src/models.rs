//! Domain models for term metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::RECORD_PREFIX;

/// Platform-assigned taxonomy term identifier.
pub type TermId = i64;

/// Store-assigned shadow record identifier.
pub type RecordId = i64;

/// Deterministic shadow record name for a term using the default prefix.
pub fn shadow_record_name(term_id: TermId) -> String {
    shadow_record_name_with_prefix(RECORD_PREFIX, term_id)
}

/// Deterministic shadow record name for a term using a custom prefix.
pub fn shadow_record_name_with_prefix(prefix: &str, term_id: TermId) -> String {
    format!("{}{}", prefix, term_id)
}

// =============================================================================
// SHADOW RECORD
// =============================================================================

/// Backing record holding the metadata of exactly one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowRecord {
    pub id: RecordId,
    pub term_id: TermId,
    pub name: String,
    pub created_at_utc: DateTime<Utc>,
}

// =============================================================================
// TERM META
// =============================================================================

/// Ordered key/value multimap attached to a term.
///
/// Keys iterate in sorted order; the values of one key keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermMeta(BTreeMap<String, Vec<String>>);

impl TermMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Total number of stored values across all keys.
    pub fn value_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// All values stored under `key`, empty when the key is absent.
    pub fn values(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value stored under `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.values(key).first().map(String::as_str)
    }

    /// Append a value under `key`.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl From<BTreeMap<String, Vec<String>>> for TermMeta {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        // Keys without values are not stored attributes.
        Self(map.into_iter().filter(|(_, v)| !v.is_empty()).collect())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TermMeta {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut meta = TermMeta::new();
        for (k, v) in iter {
            meta.push(k, v);
        }
        meta
    }
}

/// Result of a metadata read.
///
/// Which variant is returned depends only on the request shape, never on
/// whether the term has a shadow record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaLookup {
    /// `single` read: the first value, or an empty string.
    Single(String),
    /// Multi-value read of one key.
    Values(Vec<String>),
    /// Read with an empty key: every attribute of the term.
    All(TermMeta),
}

impl MetaLookup {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(v) => v.is_empty(),
            Self::Values(v) => v.is_empty(),
            Self::All(m) => m.is_empty(),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_values(self) -> Option<Vec<String>> {
        match self {
            Self::Values(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_all(self) -> Option<TermMeta> {
        match self {
            Self::All(m) => Some(m),
            _ => None,
        }
    }
}

// =============================================================================
// TAXONOMY
// =============================================================================

/// A taxonomy term as resolved by the host registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub term_id: TermId,
    pub name: String,
    /// Name of the taxonomy the term belongs to.
    pub taxonomy: String,
}

impl Term {
    pub fn new(term_id: TermId, name: impl Into<String>, taxonomy: impl Into<String>) -> Self {
        Self {
            term_id,
            name: name.into(),
            taxonomy: taxonomy.into(),
        }
    }
}

/// Taxonomy metadata as resolved by the host registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyMeta {
    pub name: String,
    /// Display label, used to key match tables.
    pub label: String,
}

impl TaxonomyMeta {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

/// Extraction matches grouped by taxonomy label.
///
/// Sequences keep append order and are never deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchTable(BTreeMap<String, Vec<TermId>>);

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a matched term under a taxonomy label.
    pub fn record(&mut self, label: impl Into<String>, term_id: TermId) {
        self.0.entry(label.into()).or_default().push(term_id);
    }

    pub fn get(&self, label: &str) -> &[TermId] {
        self.0.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Total number of matched ids across all labels.
    pub fn match_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<TermId>> {
        self.0
    }
}

impl From<BTreeMap<String, Vec<TermId>>> for MatchTable {
    fn from(map: BTreeMap<String, Vec<TermId>>) -> Self {
        Self(map)
    }
}
