//! Synonym match patterns.

use tracing::{debug, instrument};

use termeta_core::{Result, SynonymList, TermId, SYNONYM_LIST_KEY};

use super::TermRelationshipEngine;

/// Build the extraction pattern of a term from its synonyms.
///
/// Without synonyms the term name is returned unchanged. Otherwise the
/// synonyms followed by the term name are joined into a non-capturing
/// alternation: `(?:Kitten|Feline|Cat)`.
///
/// Synonyms are pattern fragments and are not escaped.
pub fn match_pattern(term_name: &str, synonyms: &SynonymList) -> String {
    if synonyms.is_empty() {
        return term_name.to_string();
    }
    let alternatives: Vec<&str> = synonyms.iter().chain(std::iter::once(term_name)).collect();
    format!("(?:{})", alternatives.join("|"))
}

impl TermRelationshipEngine {
    /// Extraction pattern for `term_name` using the synonyms stored on `term_id`.
    #[instrument(skip(self), fields(subsystem = "relations", component = "engine", op = "build_match_pattern"))]
    pub async fn build_match_pattern(&self, term_name: &str, term_id: TermId) -> Result<String> {
        let raw = self.store.get_single(term_id, SYNONYM_LIST_KEY).await?;
        let synonyms = SynonymList::parse(&raw, self.config.keep_empty_synonyms);
        let pattern = match_pattern(term_name, &synonyms);

        debug!(
            subsystem = "relations",
            component = "engine",
            term_id,
            result_count = synonyms.len(),
            "Match pattern built"
        );
        Ok(pattern)
    }
}
