//! Term relationship engine.
//!
//! Turns the reserved relationship keys of a term into extraction behavior:
//!
//! - [`build_match_pattern`](TermRelationshipEngine::build_match_pattern)
//!   widens a term name into an alternation over its synonyms
//! - [`expand_parent_matches`](TermRelationshipEngine::expand_parent_matches)
//!   credits every cross-taxonomy ancestor of a matched term
//!
//! Relationship data is read and written through [`TermMetaStore`] only.

mod parents;
mod pattern;

pub use parents::{ExpansionStop, ParentExpansion};
pub use pattern::match_pattern;

use std::sync::Arc;

use tracing::{instrument, warn};

use termeta_core::{
    ParentLink, RelationsConfig, Result, SynonymList, TaxonomyRegistry, TermId, TermRelations,
    PARENT_LINK_KEY, PARENT_LINK_TAXONOMY_KEY, SYNONYM_LIST_KEY,
};

use crate::store::TermMetaStore;

/// Synonym patterns and parent expansion over stored term relationships.
pub struct TermRelationshipEngine {
    store: Arc<TermMetaStore>,
    registry: Arc<dyn TaxonomyRegistry>,
    config: RelationsConfig,
}

impl TermRelationshipEngine {
    pub fn new(store: Arc<TermMetaStore>, registry: Arc<dyn TaxonomyRegistry>) -> Self {
        Self::with_config(store, registry, RelationsConfig::default())
    }

    pub fn with_config(
        store: Arc<TermMetaStore>,
        registry: Arc<dyn TaxonomyRegistry>,
        config: RelationsConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn store(&self) -> &Arc<TermMetaStore> {
        &self.store
    }

    pub fn config(&self) -> &RelationsConfig {
        &self.config
    }

    /// Parsed relationship keys of a term.
    ///
    /// Fails with [`Error::InvalidInput`](termeta_core::Error::InvalidInput)
    /// when a stored parent link is not a term id.
    pub async fn relations(&self, term_id: TermId) -> Result<TermRelations> {
        let meta = self.store.get_all(term_id).await?;
        TermRelations::from_meta(&meta, self.config.keep_empty_synonyms)
    }

    /// Point a term at its cross-taxonomy parent.
    ///
    /// The two keys are written one after the other. When the taxonomy write
    /// fails, the previous `parent-link` value is restored before the error
    /// is returned; a failure during that restore is only logged, so the pair
    /// is not atomic against a backing store that fails twice in a row.
    #[instrument(skip(self), fields(subsystem = "relations", component = "engine", op = "set_parent_link"))]
    pub async fn set_parent_link(&self, term_id: TermId, link: &ParentLink) -> Result<()> {
        link.validate()?;
        let previous = self.store.get_values(term_id, PARENT_LINK_KEY).await?;

        self.store
            .update(term_id, PARENT_LINK_KEY, &link.term_id.to_string(), None)
            .await?;

        if let Err(e) = self
            .store
            .update(term_id, PARENT_LINK_TAXONOMY_KEY, &link.taxonomy, None)
            .await
        {
            let restored = match previous.first() {
                Some(prev) => self.store.update(term_id, PARENT_LINK_KEY, prev, None).await,
                None => self.store.delete(term_id, PARENT_LINK_KEY, None).await,
            };
            if let Err(restore_err) = restored {
                warn!(
                    subsystem = "relations",
                    component = "engine",
                    term_id,
                    error = %restore_err,
                    "Could not restore parent link after failed taxonomy write"
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Remove a term's parent link. Returns `false` when none was stored.
    #[instrument(skip(self), fields(subsystem = "relations", component = "engine", op = "clear_parent_link"))]
    pub async fn clear_parent_link(&self, term_id: TermId) -> Result<bool> {
        let link = self.store.delete(term_id, PARENT_LINK_KEY, None).await?;
        let taxonomy = self
            .store
            .delete(term_id, PARENT_LINK_TAXONOMY_KEY, None)
            .await?;
        Ok(link || taxonomy)
    }

    /// Replace a term's synonyms. An empty list removes the key.
    #[instrument(skip(self, synonyms), fields(subsystem = "relations", component = "engine", op = "set_synonyms"))]
    pub async fn set_synonyms(&self, term_id: TermId, synonyms: &SynonymList) -> Result<bool> {
        if synonyms.is_empty() {
            return self.store.delete(term_id, SYNONYM_LIST_KEY, None).await;
        }
        self.store
            .update(term_id, SYNONYM_LIST_KEY, &synonyms.to_stored(), None)
            .await
    }
}
