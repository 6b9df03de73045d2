//! Term metadata store.
//!
//! Presents term-scoped key/value semantics over a [`ShadowRecordStore`].
//! Callers never see shadow records: the record of a term is created on its
//! first write and deleted when its last attribute is removed.
//!
//! Results follow the host platform's metadata conventions:
//!
//! - reads of absent data return empty values, never errors
//! - writes return `Ok(false)` when rejected (unique key taken, previous
//!   value not found, nothing to delete)
//! - backing store failures are returned as `Err`

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use termeta_core::{
    Error, MetaLookup, RecordId, Result, ShadowRecordStore, TermId, TermMeta,
};

use crate::locks::TermLocks;

/// Attribute write applied to an ensured shadow record.
#[derive(Debug, Clone, Copy)]
enum Write<'a> {
    Add {
        key: &'a str,
        value: &'a str,
        unique: bool,
    },
    Update {
        key: &'a str,
        value: &'a str,
        prev_value: Option<&'a str>,
    },
}

/// Term-scoped key/value metadata.
///
/// Construct once and share through an `Arc`.
pub struct TermMetaStore {
    records: Arc<dyn ShadowRecordStore>,
    locks: TermLocks,
}

impl TermMetaStore {
    pub fn new(records: Arc<dyn ShadowRecordStore>) -> Self {
        Self {
            records,
            locks: TermLocks::new(),
        }
    }

    /// The underlying record store.
    pub fn records(&self) -> &Arc<dyn ShadowRecordStore> {
        &self.records
    }

    /// Read metadata.
    ///
    /// - empty `key`: every attribute of the term
    /// - `single`: the first value under `key`, or `""`
    /// - otherwise: all values under `key`, possibly none
    #[instrument(skip(self), fields(subsystem = "store", component = "term_meta", op = "get"))]
    pub async fn get(&self, term_id: TermId, key: &str, single: bool) -> Result<MetaLookup> {
        let Some(record_id) = self.records.find_record(term_id).await? else {
            return Ok(empty_lookup(key, single));
        };

        if key.is_empty() {
            return Ok(MetaLookup::All(self.records.get_all(record_id).await?));
        }

        let values = self.records.get_values(record_id, key).await?;
        Ok(if single {
            MetaLookup::Single(values.into_iter().next().unwrap_or_default())
        } else {
            MetaLookup::Values(values)
        })
    }

    /// First value under `key`, or an empty string.
    pub async fn get_single(&self, term_id: TermId, key: &str) -> Result<String> {
        match self.records.find_record(term_id).await? {
            Some(record_id) => Ok(self
                .records
                .get_values(record_id, key)
                .await?
                .into_iter()
                .next()
                .unwrap_or_default()),
            None => Ok(String::new()),
        }
    }

    /// All values under `key`.
    pub async fn get_values(&self, term_id: TermId, key: &str) -> Result<Vec<String>> {
        match self.records.find_record(term_id).await? {
            Some(record_id) => self.records.get_values(record_id, key).await,
            None => Ok(Vec::new()),
        }
    }

    /// Every attribute of the term.
    pub async fn get_all(&self, term_id: TermId) -> Result<TermMeta> {
        match self.records.find_record(term_id).await? {
            Some(record_id) => self.records.get_all(record_id).await,
            None => Ok(TermMeta::new()),
        }
    }

    /// Append `value` under `key`.
    ///
    /// With `unique`, returns `false` and writes nothing if `key` already
    /// holds a value.
    #[instrument(skip(self, value), fields(subsystem = "store", component = "term_meta", op = "add"))]
    pub async fn add(&self, term_id: TermId, key: &str, value: &str, unique: bool) -> Result<bool> {
        validate_key(key)?;
        let _guard = self.locks.lock(term_id).await;
        self.write(term_id, Write::Add { key, value, unique }).await
    }

    /// Replace values under `key`.
    ///
    /// With `prev_value`, only values equal to it are replaced; without it,
    /// all values under `key` become the single `value`. An absent key is
    /// added. An empty `prev_value` counts as absent.
    #[instrument(skip(self, value, prev_value), fields(subsystem = "store", component = "term_meta", op = "update"))]
    pub async fn update(
        &self,
        term_id: TermId,
        key: &str,
        value: &str,
        prev_value: Option<&str>,
    ) -> Result<bool> {
        validate_key(key)?;
        let prev_value = prev_value.filter(|v| !v.is_empty());
        let _guard = self.locks.lock(term_id).await;
        self.write(
            term_id,
            Write::Update {
                key,
                value,
                prev_value,
            },
        )
        .await
    }

    /// Remove all values under `key`, or only `value` when given.
    ///
    /// Returns `false` when the term has no metadata or nothing matched. The
    /// shadow record is deleted once its last attribute is gone.
    #[instrument(skip(self, value), fields(subsystem = "store", component = "term_meta", op = "delete"))]
    pub async fn delete(&self, term_id: TermId, key: &str, value: Option<&str>) -> Result<bool> {
        validate_key(key)?;
        let value = value.filter(|v| !v.is_empty());
        let _guard = self.locks.lock(term_id).await;

        let Some(record_id) = self.records.find_record(term_id).await? else {
            return Ok(false);
        };

        let removed = self
            .records
            .delete_values(record_id, key, value)
            .await
            .inspect_err(|e| log_failure("delete", term_id, e))?;
        self.prune(term_id, record_id).await?;
        Ok(removed)
    }

    /// Drop every attribute of a term together with its shadow record.
    #[instrument(skip(self), fields(subsystem = "store", component = "term_meta", op = "purge"))]
    pub async fn purge(&self, term_id: TermId) -> Result<bool> {
        let _guard = self.locks.lock(term_id).await;
        match self.records.find_record(term_id).await? {
            Some(record_id) => self
                .records
                .delete_record(record_id)
                .await
                .inspect_err(|e| log_failure("purge", term_id, e)),
            None => Ok(false),
        }
    }

    /// The shadow record backing a term, if it has any metadata.
    pub async fn record_for(&self, term_id: TermId) -> Result<Option<RecordId>> {
        self.records.find_record(term_id).await
    }

    /// Ensure the shadow record and apply `op`. A record pruned concurrently
    /// between the two steps is re-created once.
    async fn write(&self, term_id: TermId, op: Write<'_>) -> Result<bool> {
        let mut retried = false;
        loop {
            let record_id = self
                .records
                .ensure_record(term_id)
                .await
                .inspect_err(|e| log_failure("ensure_record", term_id, e))?;

            let result = self.apply(record_id, op).await;
            match result {
                Err(Error::ShadowRecordMissing(_)) if !retried => {
                    debug!(
                        subsystem = "store",
                        component = "term_meta",
                        term_id,
                        record_id,
                        "Shadow record vanished before write, retrying"
                    );
                    retried = true;
                }
                Ok(true) => return Ok(true),
                other => {
                    if let Err(e) = &other {
                        log_failure("write", term_id, e);
                    }
                    // The record may have been created for this write alone.
                    // A failed prune is logged; the write's own outcome is returned.
                    if let Err(e) = self.prune(term_id, record_id).await {
                        log_failure("prune", term_id, &e);
                    }
                    return other;
                }
            }
        }
    }

    async fn apply(&self, record_id: RecordId, op: Write<'_>) -> Result<bool> {
        match op {
            Write::Add { key, value, unique } => {
                self.records.add_value(record_id, key, value, unique).await
            }
            Write::Update {
                key,
                value,
                prev_value,
            } => {
                self.records
                    .update_values(record_id, key, value, prev_value)
                    .await
            }
        }
    }

    async fn prune(&self, term_id: TermId, record_id: RecordId) -> Result<()> {
        if self.records.delete_record_if_empty(record_id).await? {
            debug!(
                subsystem = "store",
                component = "term_meta",
                term_id,
                record_id,
                "Last attribute removed, shadow record deleted"
            );
        }
        Ok(())
    }
}

fn empty_lookup(key: &str, single: bool) -> MetaLookup {
    if key.is_empty() {
        MetaLookup::All(TermMeta::new())
    } else if single {
        MetaLookup::Single(String::new())
    } else {
        MetaLookup::Values(Vec::new())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidInput("Meta key cannot be empty".to_string()));
    }
    Ok(())
}

fn log_failure(op: &str, term_id: TermId, error: &Error) {
    warn!(
        subsystem = "store",
        component = "term_meta",
        op,
        term_id,
        error = %error,
        "Backing store call failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use termeta_core::MemoryRecordStore;

    fn setup() -> (MemoryRecordStore, TermMetaStore) {
        let records = MemoryRecordStore::new();
        let store = TermMetaStore::new(Arc::new(records.clone()));
        (records, store)
    }

    #[tokio::test]
    async fn test_add_then_delete_removes_record() {
        let (records, store) = setup();

        assert!(store.add(7, "k", "v", false).await.unwrap());
        assert!(store.record_for(7).await.unwrap().is_some());

        assert!(store.delete(7, "k", Some("v")).await.unwrap());
        assert!(store.get_all(7).await.unwrap().is_empty());
        assert_eq!(store.record_for(7).await.unwrap(), None);
        assert_eq!(records.record_count(), 0);
    }

    #[tokio::test]
    async fn test_reads_without_record_are_empty() {
        let (records, store) = setup();

        assert_eq!(
            store.get(3, "any", true).await.unwrap(),
            MetaLookup::Single(String::new())
        );
        assert_eq!(
            store.get(3, "any", false).await.unwrap(),
            MetaLookup::Values(vec![])
        );
        assert_eq!(
            store.get(3, "", false).await.unwrap(),
            MetaLookup::All(TermMeta::new())
        );
        assert_eq!(records.record_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_key_reads_like_missing_record() {
        let (_, store) = setup();
        store.add(3, "other", "x", false).await.unwrap();

        assert_eq!(
            store.get(3, "any", true).await.unwrap(),
            store.get(4, "any", true).await.unwrap()
        );
        assert_eq!(
            store.get(3, "any", false).await.unwrap(),
            store.get(4, "any", false).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_get_shapes() {
        let (_, store) = setup();
        store.add(1, "k", "a", false).await.unwrap();
        store.add(1, "k", "b", false).await.unwrap();
        store.add(1, "j", "z", false).await.unwrap();

        assert_eq!(
            store.get(1, "k", true).await.unwrap(),
            MetaLookup::Single("a".to_string())
        );
        assert_eq!(
            store.get(1, "k", false).await.unwrap(),
            MetaLookup::Values(vec!["a".to_string(), "b".to_string()])
        );

        let all = store.get(1, "", true).await.unwrap().into_all().unwrap();
        assert_eq!(all.values("k"), ["a", "b"]);
        assert_eq!(all.values("j"), ["z"]);
    }

    #[tokio::test]
    async fn test_unique_add_rejects_second_value() {
        let (_, store) = setup();

        assert!(store.add(1, "k", "v1", true).await.unwrap());
        assert!(!store.add(1, "k", "v2", true).await.unwrap());
        assert_eq!(store.get_values(1, "k").await.unwrap(), ["v1"]);
    }

    #[tokio::test]
    async fn test_update_with_prev_value_replaces_one() {
        let (_, store) = setup();
        store.add(1, "k", "a", false).await.unwrap();
        store.add(1, "k", "b", false).await.unwrap();

        assert!(store.update(1, "k", "c", Some("a")).await.unwrap());
        assert_eq!(store.get_values(1, "k").await.unwrap(), ["c", "b"]);

        assert!(store.update(1, "k", "d", None).await.unwrap());
        assert_eq!(store.get_values(1, "k").await.unwrap(), ["d"]);
    }

    #[tokio::test]
    async fn test_update_creates_record_and_key() {
        let (records, store) = setup();

        assert!(store.update(9, "k", "v", None).await.unwrap());
        assert_eq!(store.get_single(9, "k").await.unwrap(), "v");
        assert_eq!(records.record_count(), 1);
    }

    #[tokio::test]
    async fn test_update_prev_value_mismatch() {
        let (_, store) = setup();
        store.add(1, "k", "a", false).await.unwrap();

        assert!(!store.update(1, "k", "c", Some("nope")).await.unwrap());
        assert_eq!(store.get_values(1, "k").await.unwrap(), ["a"]);
    }

    #[tokio::test]
    async fn test_empty_prev_value_counts_as_absent() {
        let (_, store) = setup();
        store.add(1, "k", "a", false).await.unwrap();
        store.add(1, "k", "b", false).await.unwrap();

        assert!(store.update(1, "k", "z", Some("")).await.unwrap());
        assert_eq!(store.get_values(1, "k").await.unwrap(), ["z"]);
    }

    #[tokio::test]
    async fn test_delete_without_record_is_false() {
        let (records, store) = setup();
        assert!(!store.delete(1, "k", None).await.unwrap());
        assert_eq!(records.record_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_single_value_keeps_others() {
        let (_, store) = setup();
        store.add(1, "k", "a", false).await.unwrap();
        store.add(1, "k", "b", false).await.unwrap();

        assert!(store.delete(1, "k", Some("a")).await.unwrap());
        assert_eq!(store.get_values(1, "k").await.unwrap(), ["b"]);
        assert!(store.record_for(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_whole_key_with_empty_value() {
        let (_, store) = setup();
        store.add(1, "k", "a", false).await.unwrap();
        store.add(1, "k", "b", false).await.unwrap();
        store.add(1, "keep", "x", false).await.unwrap();

        assert!(store.delete(1, "k", Some("")).await.unwrap());
        assert!(store.get_values(1, "k").await.unwrap().is_empty());
        assert_eq!(store.get_single(1, "keep").await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_delete_unmatched_value_keeps_record() {
        let (_, store) = setup();
        store.add(1, "k", "a", false).await.unwrap();

        assert!(!store.delete(1, "k", Some("zzz")).await.unwrap());
        assert!(store.record_for(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge() {
        let (records, store) = setup();
        store.add(1, "k", "a", false).await.unwrap();
        store.add(1, "j", "b", false).await.unwrap();

        assert!(store.purge(1).await.unwrap());
        assert!(!store.purge(1).await.unwrap());
        assert_eq!(records.record_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let (_, store) = setup();
        assert!(matches!(
            store.add(1, "", "v", false).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(store.update(1, "", "v", None).await.is_err());
        assert!(store.delete(1, "", None).await.is_err());
    }

    #[tokio::test]
    async fn test_record_creation_failure_propagates() {
        let (records, store) = setup();
        records.set_fail_creates(true);

        assert!(matches!(
            store.add(1, "k", "v", false).await,
            Err(Error::BackingStore(_))
        ));
        assert!(store.update(1, "k", "v", None).await.is_err());
        assert_eq!(records.record_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_first_write_leaves_no_empty_record() {
        let (records, store) = setup();
        records.set_fail_writes(true);

        assert!(store.add(1, "k", "v", false).await.is_err());
        assert_eq!(records.record_count(), 0);

        records.set_fail_writes(false);
        assert!(store.add(1, "k", "v", false).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_writes_share_one_record() {
        let (records, store) = setup();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add(42, "k", &format!("v{}", i), false).await })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            assert!(result.unwrap().unwrap());
        }

        assert_eq!(records.record_count(), 1);
        assert_eq!(store.get_values(42, "k").await.unwrap().len(), 16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_unique_adds_admit_one() {
        let (_, store) = setup();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add(5, "k", &format!("v{}", i), true).await })
            })
            .collect();

        let accepted = futures::future::join_all(handles)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(true))))
            .count();

        assert_eq!(accepted, 1);
        assert_eq!(store.get_values(5, "k").await.unwrap().len(), 1);
    }

    /// Record store with scripted interference from other processes.
    struct FlakyStore {
        inner: MemoryRecordStore,
        /// The next write finds its record pruned.
        vanish_next_write: AtomicBool,
        /// Empty-record pruning fails.
        fail_prune: AtomicBool,
    }

    impl FlakyStore {
        fn new(inner: MemoryRecordStore) -> Self {
            Self {
                inner,
                vanish_next_write: AtomicBool::new(false),
                fail_prune: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ShadowRecordStore for FlakyStore {
        async fn find_record(&self, term_id: TermId) -> Result<Option<RecordId>> {
            self.inner.find_record(term_id).await
        }

        async fn ensure_record(&self, term_id: TermId) -> Result<RecordId> {
            self.inner.ensure_record(term_id).await
        }

        async fn delete_record(&self, record_id: RecordId) -> Result<bool> {
            self.inner.delete_record(record_id).await
        }

        async fn delete_record_if_empty(&self, record_id: RecordId) -> Result<bool> {
            if self.fail_prune.load(Ordering::SeqCst) {
                return Err(Error::Internal("prune rejected".to_string()));
            }
            self.inner.delete_record_if_empty(record_id).await
        }

        async fn get_values(&self, record_id: RecordId, key: &str) -> Result<Vec<String>> {
            self.inner.get_values(record_id, key).await
        }

        async fn get_all(&self, record_id: RecordId) -> Result<TermMeta> {
            self.inner.get_all(record_id).await
        }

        async fn add_value(
            &self,
            record_id: RecordId,
            key: &str,
            value: &str,
            unique: bool,
        ) -> Result<bool> {
            if self.vanish_next_write.swap(false, Ordering::SeqCst) {
                self.inner.delete_record(record_id).await?;
            }
            self.inner.add_value(record_id, key, value, unique).await
        }

        async fn update_values(
            &self,
            record_id: RecordId,
            key: &str,
            value: &str,
            prev_value: Option<&str>,
        ) -> Result<bool> {
            self.inner
                .update_values(record_id, key, value, prev_value)
                .await
        }

        async fn delete_values(
            &self,
            record_id: RecordId,
            key: &str,
            value: Option<&str>,
        ) -> Result<bool> {
            self.inner.delete_values(record_id, key, value).await
        }
    }

    #[tokio::test]
    async fn test_write_retries_after_concurrent_prune() {
        let inner = MemoryRecordStore::new();
        let flaky = FlakyStore::new(inner.clone());
        flaky.vanish_next_write.store(true, Ordering::SeqCst);
        let store = TermMetaStore::new(Arc::new(flaky));

        assert!(store.add(1, "k", "v", false).await.unwrap());
        assert_eq!(store.get_single(1, "k").await.unwrap(), "v");
        assert_eq!(inner.record_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_prune_keeps_write_error() {
        let inner = MemoryRecordStore::new();
        let flaky = FlakyStore::new(inner.clone());
        flaky.fail_prune.store(true, Ordering::SeqCst);
        let store = TermMetaStore::new(Arc::new(flaky));
        inner.set_fail_writes(true);

        let result = store.add(1, "k", "v", false).await;
        assert!(matches!(result, Err(Error::BackingStore(_))));
    }

    #[tokio::test]
    async fn test_failed_prune_keeps_rejection_result() {
        let inner = MemoryRecordStore::new();
        let flaky = Arc::new(FlakyStore::new(inner.clone()));
        let store = TermMetaStore::new(flaky.clone());
        store.add(1, "k", "v1", true).await.unwrap();
        flaky.fail_prune.store(true, Ordering::SeqCst);

        assert!(!store.add(1, "k", "v2", true).await.unwrap());
        assert_eq!(store.get_values(1, "k").await.unwrap(), ["v1"]);
    }

    #[tokio::test]
    async fn test_delete_failure_propagates_and_keeps_record() {
        let (records, store) = setup();
        store.add(1, "k", "v", false).await.unwrap();
        records.set_fail_writes(true);

        assert!(matches!(
            store.delete(1, "k", Some("v")).await,
            Err(Error::BackingStore(_))
        ));
        assert!(store.record_for(1).await.unwrap().is_some());

        records.set_fail_writes(false);
        assert_eq!(store.get_values(1, "k").await.unwrap(), ["v"]);
    }
}
