//! Term edit form submissions.
//!
//! The term edit and create forms post three relationship fields. Each field
//! that is present in a submission is written with [`TermMetaStore::update`];
//! absent fields leave the stored value untouched. A present but empty field
//! is stored as an empty value, which reads back as "no parent" or "no
//! synonyms".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use termeta_core::{
    Result, TermId, PARENT_LINK_KEY, PARENT_LINK_TAXONOMY_KEY, SYNONYM_LIST_KEY,
};

use crate::store::TermMetaStore;

/// Form field carrying the parent term id.
pub const PARENT_FIELD: &str = "ec_parent";

/// Form field carrying the parent term's taxonomy.
pub const PARENT_TAXONOMY_FIELD: &str = "ec_parent_taxonomy";

/// Form field carrying the comma-separated synonym list.
pub const SYNONYMS_FIELD: &str = "ec_term_map";

/// Relationship fields posted with a term form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFieldsSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_taxonomy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<String>,
}

impl TermFieldsSubmission {
    /// Pick the relationship fields out of a raw form body.
    ///
    /// Accepts the form field names as well as the reserved metadata key
    /// names. When both spellings are posted the form field name wins.
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let field = |form_name: &str, key: &str| {
            form.get(form_name).or_else(|| form.get(key)).cloned()
        };
        Self {
            parent: field(PARENT_FIELD, PARENT_LINK_KEY),
            parent_taxonomy: field(PARENT_TAXONOMY_FIELD, PARENT_LINK_TAXONOMY_KEY),
            synonyms: field(SYNONYMS_FIELD, SYNONYM_LIST_KEY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_none() && self.parent_taxonomy.is_none() && self.synonyms.is_none()
    }

    fn writes(&self) -> [(&'static str, Option<&str>); 3] {
        [
            (PARENT_LINK_KEY, self.parent.as_deref()),
            (PARENT_LINK_TAXONOMY_KEY, self.parent_taxonomy.as_deref()),
            (SYNONYM_LIST_KEY, self.synonyms.as_deref()),
        ]
    }
}

/// Which fields a save wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFields {
    pub parent: bool,
    pub parent_taxonomy: bool,
    pub synonyms: bool,
}

impl SavedFields {
    pub fn count(&self) -> usize {
        [self.parent, self.parent_taxonomy, self.synonyms]
            .into_iter()
            .filter(|saved| *saved)
            .count()
    }

    pub fn any(&self) -> bool {
        self.count() > 0
    }

    fn mark(&mut self, key: &str) {
        match key {
            PARENT_LINK_KEY => self.parent = true,
            PARENT_LINK_TAXONOMY_KEY => self.parent_taxonomy = true,
            SYNONYM_LIST_KEY => self.synonyms = true,
            _ => {}
        }
    }
}

/// Persist the relationship fields of a submitted term form.
#[instrument(skip(store, submission), fields(subsystem = "fields", component = "term_form", op = "save"))]
pub async fn save_term_fields(
    store: &TermMetaStore,
    term_id: TermId,
    submission: &TermFieldsSubmission,
) -> Result<SavedFields> {
    let mut saved = SavedFields::default();

    for (key, value) in submission.writes() {
        let Some(value) = value else { continue };
        if store.update(term_id, key, value, None).await? {
            saved.mark(key);
        }
    }

    debug!(
        subsystem = "fields",
        component = "term_form",
        term_id,
        result_count = saved.count(),
        "Term form fields saved"
    );
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use termeta_core::MemoryRecordStore;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_form_reads_form_names() {
        let submission = TermFieldsSubmission::from_form(&form(&[
            ("ec_parent", "12"),
            ("ec_parent_taxonomy", "genre"),
            ("ec_term_map", "Kitten, Feline"),
            ("name", "Cat"),
        ]));

        assert_eq!(submission.parent.as_deref(), Some("12"));
        assert_eq!(submission.parent_taxonomy.as_deref(), Some("genre"));
        assert_eq!(submission.synonyms.as_deref(), Some("Kitten, Feline"));
    }

    #[test]
    fn test_from_form_accepts_reserved_key_names() {
        let submission = TermFieldsSubmission::from_form(&form(&[
            ("synonym-list", "Kitten"),
            ("ec_term_map", "Feline"),
            ("parent-link", "3"),
        ]));

        assert_eq!(submission.synonyms.as_deref(), Some("Feline"));
        assert_eq!(submission.parent.as_deref(), Some("3"));
        assert_eq!(submission.parent_taxonomy, None);
    }

    #[test]
    fn test_from_form_without_fields() {
        assert!(TermFieldsSubmission::from_form(&form(&[("name", "Cat")])).is_empty());
    }

    #[tokio::test]
    async fn test_save_writes_present_fields_only() {
        let store = TermMetaStore::new(Arc::new(MemoryRecordStore::new()));
        store.add(1, SYNONYM_LIST_KEY, "Old", false).await.unwrap();

        let saved = save_term_fields(
            &store,
            1,
            &TermFieldsSubmission {
                parent: Some("4".to_string()),
                parent_taxonomy: Some("animals".to_string()),
                synonyms: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(saved.count(), 2);
        assert!(!saved.synonyms);
        assert_eq!(store.get_single(1, PARENT_LINK_KEY).await.unwrap(), "4");
        assert_eq!(
            store.get_single(1, PARENT_LINK_TAXONOMY_KEY).await.unwrap(),
            "animals"
        );
        assert_eq!(store.get_values(1, SYNONYM_LIST_KEY).await.unwrap(), ["Old"]);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_values() {
        let store = TermMetaStore::new(Arc::new(MemoryRecordStore::new()));
        store.add(1, SYNONYM_LIST_KEY, "a", false).await.unwrap();
        store.add(1, SYNONYM_LIST_KEY, "b", false).await.unwrap();

        let submission = TermFieldsSubmission {
            synonyms: Some("c".to_string()),
            ..Default::default()
        };
        let saved = save_term_fields(&store, 1, &submission).await.unwrap();

        assert!(saved.synonyms);
        assert_eq!(store.get_values(1, SYNONYM_LIST_KEY).await.unwrap(), ["c"]);
    }

    #[tokio::test]
    async fn test_save_empty_submission_writes_nothing() {
        let records = MemoryRecordStore::new();
        let store = TermMetaStore::new(Arc::new(records.clone()));

        let saved = save_term_fields(&store, 1, &TermFieldsSubmission::default())
            .await
            .unwrap();

        assert!(!saved.any());
        assert_eq!(records.record_count(), 0);
    }
}
