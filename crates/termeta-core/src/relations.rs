//! Typed view of the reserved relationship keys.
//!
//! Three metadata keys carry term relationships used during term extraction:
//!
//! - `parent-link`: id of a parent term, possibly in another taxonomy
//! - `parent-link-taxonomy`: taxonomy of that parent term
//! - `synonym-list`: comma-separated alternate words for the term
//!
//! The relationship engine reads these keys only through [`TermRelations`],
//! never by probing the raw multimap.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{TermId, TermMeta};

/// Key holding the parent term id.
pub const PARENT_LINK_KEY: &str = "parent-link";

/// Key holding the taxonomy of the parent term.
pub const PARENT_LINK_TAXONOMY_KEY: &str = "parent-link-taxonomy";

/// Key holding the comma-separated synonym list.
pub const SYNONYM_LIST_KEY: &str = "synonym-list";

/// Metadata keys reserved for term relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReservedKey {
    ParentLink,
    ParentLinkTaxonomy,
    SynonymList,
}

impl ReservedKey {
    pub const ALL: [ReservedKey; 3] = [
        ReservedKey::ParentLink,
        ReservedKey::ParentLinkTaxonomy,
        ReservedKey::SynonymList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParentLink => PARENT_LINK_KEY,
            Self::ParentLinkTaxonomy => PARENT_LINK_TAXONOMY_KEY,
            Self::SynonymList => SYNONYM_LIST_KEY,
        }
    }

    /// Whether a caller-supplied key collides with a reserved key.
    pub fn is_reserved(key: &str) -> bool {
        key.parse::<ReservedKey>().is_ok()
    }
}

impl std::fmt::Display for ReservedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReservedKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            PARENT_LINK_KEY => Ok(Self::ParentLink),
            PARENT_LINK_TAXONOMY_KEY => Ok(Self::ParentLinkTaxonomy),
            SYNONYM_LIST_KEY => Ok(Self::SynonymList),
            _ => Err(format!("Not a reserved key: {}", s)),
        }
    }
}

// =============================================================================
// PARENT LINK
// =============================================================================

/// Cross-taxonomy parent reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentLink {
    pub term_id: TermId,
    pub taxonomy: String,
}

impl ParentLink {
    pub fn new(term_id: TermId, taxonomy: impl Into<String>) -> Self {
        Self {
            term_id,
            taxonomy: taxonomy.into(),
        }
    }

    /// Read the parent reference from a term's metadata.
    ///
    /// Both keys must be present. An empty `parent-link` (a cleared parent
    /// selector) means no parent. A `parent-link` that is not an integer is
    /// reported as invalid input.
    pub fn from_meta(meta: &TermMeta) -> Result<Option<Self>> {
        let (Some(raw_id), Some(taxonomy)) = (
            meta.first(PARENT_LINK_KEY),
            meta.first(PARENT_LINK_TAXONOMY_KEY),
        ) else {
            return Ok(None);
        };

        let raw_id = raw_id.trim();
        if raw_id.is_empty() {
            return Ok(None);
        }

        let term_id = raw_id.parse::<TermId>().map_err(|_| {
            Error::InvalidInput(format!("{} is not a term id: {:?}", PARENT_LINK_KEY, raw_id))
        })?;

        Ok(Some(Self::new(term_id, taxonomy.trim())))
    }

    /// Validate before persisting.
    pub fn validate(&self) -> Result<()> {
        if self.taxonomy.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Parent link taxonomy cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// SYNONYM LIST
// =============================================================================

/// Alternate words mapped onto a term during extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynonymList(Vec<String>);

impl SynonymList {
    pub fn new(synonyms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(synonyms.into_iter().map(Into::into).collect())
    }

    /// Parse a stored comma-separated list.
    ///
    /// Entries are trimmed. Entries left empty by stray commas are dropped
    /// unless `keep_empty` is set.
    pub fn parse(raw: &str, keep_empty: bool) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|s| keep_empty || !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Stored form, as written to `synonym-list`.
    pub fn to_stored(&self) -> String {
        self.0.join(", ")
    }
}

// =============================================================================
// TERM RELATIONS
// =============================================================================

/// Relationship data of one term, parsed from its reserved keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRelations {
    pub parent: Option<ParentLink>,
    pub synonyms: SynonymList,
}

impl TermRelations {
    /// Parse the reserved keys out of a term's metadata.
    ///
    /// Fails only when a parent link is present but malformed.
    pub fn from_meta(meta: &TermMeta, keep_empty_synonyms: bool) -> Result<Self> {
        Ok(Self {
            parent: ParentLink::from_meta(meta)?,
            synonyms: meta
                .first(SYNONYM_LIST_KEY)
                .map(|raw| SynonymList::parse(raw, keep_empty_synonyms))
                .unwrap_or_default(),
        })
    }
}
