//! Core traits for the host collaborators.
//!
//! These traits define the interfaces that concrete implementations
//! (PostgreSQL in `termeta-db`, in-memory in [`crate::memory`]) must satisfy.

use async_trait::async_trait;

use crate::{RecordId, Result, TaxonomyMeta, Term, TermId, TermMeta};

// =============================================================================
// SHADOW RECORD STORE
// =============================================================================

/// Storage of shadow records and their key/value attributes.
///
/// Each call is atomic on its own. Composite behavior (create on first
/// write, delete on last remove) is built on top by the metadata store.
#[async_trait]
pub trait ShadowRecordStore: Send + Sync {
    /// Look up the shadow record of a term. At most one record exists per term.
    async fn find_record(&self, term_id: TermId) -> Result<Option<RecordId>>;

    /// Return the term's shadow record, creating it if absent.
    ///
    /// Concurrent callers for the same term must receive the same id.
    async fn ensure_record(&self, term_id: TermId) -> Result<RecordId>;

    /// Delete a shadow record and all of its attributes.
    async fn delete_record(&self, record_id: RecordId) -> Result<bool>;

    /// Delete a shadow record only if it holds no attribute.
    async fn delete_record_if_empty(&self, record_id: RecordId) -> Result<bool>;

    /// Values stored under `key`, in insertion order.
    async fn get_values(&self, record_id: RecordId, key: &str) -> Result<Vec<String>>;

    /// Every attribute of a record.
    async fn get_all(&self, record_id: RecordId) -> Result<TermMeta>;

    /// Append a value. With `unique`, nothing is written and `false` is
    /// returned when `key` already holds a value.
    async fn add_value(
        &self,
        record_id: RecordId,
        key: &str,
        value: &str,
        unique: bool,
    ) -> Result<bool>;

    /// Replace values under `key`.
    ///
    /// Absent key: `value` is added. With `prev_value`, only matching values
    /// are replaced and `false` means none matched. Without it, all values
    /// under the key collapse into `value`.
    async fn update_values(
        &self,
        record_id: RecordId,
        key: &str,
        value: &str,
        prev_value: Option<&str>,
    ) -> Result<bool>;

    /// Remove all values under `key`, or only those equal to `value`.
    /// Returns whether anything was removed.
    async fn delete_values(&self, record_id: RecordId, key: &str, value: Option<&str>)
        -> Result<bool>;
}

// =============================================================================
// TAXONOMY REGISTRY
// =============================================================================

/// Host registry of taxonomies and their terms.
#[async_trait]
pub trait TaxonomyRegistry: Send + Sync {
    /// Resolve a term by id within a taxonomy.
    async fn get_term(&self, term_id: TermId, taxonomy: &str) -> Result<Option<Term>>;

    /// Resolve taxonomy metadata (display label) by taxonomy name.
    async fn get_taxonomy(&self, taxonomy: &str) -> Result<Option<TaxonomyMeta>>;
}
