//! In-process implementations of the host collaborators.
//!
//! [`MemoryRecordStore`] and [`MemoryTaxonomyRegistry`] back unit tests and
//! hosts that keep term metadata in memory. Both are cheap to clone; clones
//! share state.
//!
//! ## Usage
//!
//! ```rust
//! use termeta_core::{MemoryTaxonomyRegistry, Term};
//!
//! let registry = MemoryTaxonomyRegistry::new()
//!     .with_taxonomy("genre", "Genres")
//!     .with_term(Term::new(3, "Jazz", "genre"));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::models::shadow_record_name;
use crate::{
    Error, RecordId, Result, ShadowRecord, ShadowRecordStore, TaxonomyMeta, TaxonomyRegistry,
    Term, TermId, TermMeta,
};

// =============================================================================
// RECORD STORE
// =============================================================================

#[derive(Debug, Default)]
struct RecordState {
    next_id: RecordId,
    records: HashMap<TermId, ShadowRecord>,
    /// Attribute rows per record, in insertion order.
    values: HashMap<RecordId, Vec<(String, String)>>,
}

impl RecordState {
    fn rows(&mut self, record_id: RecordId) -> Result<&mut Vec<(String, String)>> {
        self.values
            .get_mut(&record_id)
            .ok_or(Error::ShadowRecordMissing(record_id))
    }
}

/// Shadow record store held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    state: Arc<Mutex<RecordState>>,
    fail_creates: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make record creation fail until reset.
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Make attribute writes fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of shadow records currently stored.
    pub fn record_count(&self) -> usize {
        self.lock().map(|s| s.records.len()).unwrap_or(0)
    }

    /// The stored shadow record of a term, if any.
    pub fn record(&self, term_id: TermId) -> Option<ShadowRecord> {
        self.lock()
            .ok()
            .and_then(|s| s.records.get(&term_id).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, RecordState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("memory record store lock poisoned".to_string()))
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::BackingStore("attribute write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ShadowRecordStore for MemoryRecordStore {
    async fn find_record(&self, term_id: TermId) -> Result<Option<RecordId>> {
        Ok(self.lock()?.records.get(&term_id).map(|r| r.id))
    }

    async fn ensure_record(&self, term_id: TermId) -> Result<RecordId> {
        let mut state = self.lock()?;
        if let Some(record) = state.records.get(&term_id) {
            return Ok(record.id);
        }
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Error::BackingStore("record creation rejected".to_string()));
        }

        state.next_id += 1;
        let id = state.next_id;
        state.records.insert(
            term_id,
            ShadowRecord {
                id,
                term_id,
                name: shadow_record_name(term_id),
                created_at_utc: Utc::now(),
            },
        );
        state.values.insert(id, Vec::new());
        Ok(id)
    }

    async fn delete_record(&self, record_id: RecordId) -> Result<bool> {
        let mut state = self.lock()?;
        let before = state.records.len();
        state.records.retain(|_, r| r.id != record_id);
        state.values.remove(&record_id);
        Ok(state.records.len() < before)
    }

    async fn delete_record_if_empty(&self, record_id: RecordId) -> Result<bool> {
        let mut state = self.lock()?;
        let empty = state
            .values
            .get(&record_id)
            .is_some_and(|rows| rows.is_empty());
        if !empty {
            return Ok(false);
        }
        state.values.remove(&record_id);
        state.records.retain(|_, r| r.id != record_id);
        Ok(true)
    }

    async fn get_values(&self, record_id: RecordId, key: &str) -> Result<Vec<String>> {
        let state = self.lock()?;
        Ok(state
            .values
            .get(&record_id)
            .map(|rows| {
                rows.iter()
                    .filter(|(k, _)| k == key)
                    .map(|(_, v)| v.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_all(&self, record_id: RecordId) -> Result<TermMeta> {
        let state = self.lock()?;
        Ok(state
            .values
            .get(&record_id)
            .map(|rows| rows.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect())
            .unwrap_or_default())
    }

    async fn add_value(
        &self,
        record_id: RecordId,
        key: &str,
        value: &str,
        unique: bool,
    ) -> Result<bool> {
        self.check_writes()?;
        let mut state = self.lock()?;
        let rows = state.rows(record_id)?;
        if unique && rows.iter().any(|(k, _)| k == key) {
            return Ok(false);
        }
        rows.push((key.to_string(), value.to_string()));
        Ok(true)
    }

    async fn update_values(
        &self,
        record_id: RecordId,
        key: &str,
        value: &str,
        prev_value: Option<&str>,
    ) -> Result<bool> {
        self.check_writes()?;
        let mut state = self.lock()?;
        let rows = state.rows(record_id)?;

        if !rows.iter().any(|(k, _)| k == key) {
            rows.push((key.to_string(), value.to_string()));
            return Ok(true);
        }

        match prev_value {
            Some(prev) => {
                let mut replaced = false;
                for (k, v) in rows.iter_mut() {
                    if k == key && v == prev {
                        *v = value.to_string();
                        replaced = true;
                    }
                }
                Ok(replaced)
            }
            None => {
                // Keep the first row in place, drop the rest.
                let mut seen = false;
                rows.retain_mut(|(k, v)| {
                    if k != key {
                        return true;
                    }
                    if seen {
                        return false;
                    }
                    seen = true;
                    *v = value.to_string();
                    true
                });
                Ok(true)
            }
        }
    }

    async fn delete_values(
        &self,
        record_id: RecordId,
        key: &str,
        value: Option<&str>,
    ) -> Result<bool> {
        self.check_writes()?;
        let mut state = self.lock()?;
        let Some(rows) = state.values.get_mut(&record_id) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|(k, v)| !(k == key && value.map_or(true, |expected| v == expected)));
        Ok(rows.len() < before)
    }
}

// =============================================================================
// TAXONOMY REGISTRY
// =============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    taxonomies: HashMap<String, TaxonomyMeta>,
    terms: HashMap<(TermId, String), Term>,
}

/// Taxonomy registry held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTaxonomyRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl MemoryTaxonomyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert_taxonomy`](Self::insert_taxonomy).
    pub fn with_taxonomy(self, name: &str, label: &str) -> Self {
        self.insert_taxonomy(TaxonomyMeta::new(name, label));
        self
    }

    /// Builder form of [`insert_term`](Self::insert_term).
    pub fn with_term(self, term: Term) -> Self {
        self.insert_term(term);
        self
    }

    pub fn insert_taxonomy(&self, taxonomy: TaxonomyMeta) {
        if let Ok(mut state) = self.state.lock() {
            state.taxonomies.insert(taxonomy.name.clone(), taxonomy);
        }
    }

    pub fn insert_term(&self, term: Term) {
        if let Ok(mut state) = self.state.lock() {
            state
                .terms
                .insert((term.term_id, term.taxonomy.clone()), term);
        }
    }

    pub fn remove_term(&self, term_id: TermId, taxonomy: &str) -> Option<Term> {
        self.state
            .lock()
            .ok()
            .and_then(|mut s| s.terms.remove(&(term_id, taxonomy.to_string())))
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("memory taxonomy registry lock poisoned".to_string()))
    }
}

#[async_trait]
impl TaxonomyRegistry for MemoryTaxonomyRegistry {
    async fn get_term(&self, term_id: TermId, taxonomy: &str) -> Result<Option<Term>> {
        Ok(self
            .lock()?
            .terms
            .get(&(term_id, taxonomy.to_string()))
            .cloned())
    }

    async fn get_taxonomy(&self, taxonomy: &str) -> Result<Option<TaxonomyMeta>> {
        Ok(self.lock()?.taxonomies.get(taxonomy).cloned())
    }
}
