//! Per-term write serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use termeta_core::{defaults::LOCK_TABLE_PRUNE_THRESHOLD, TermId};

/// Keyed async lock: one mutex per term id.
///
/// Entries nobody holds or waits on are pruned once the table grows past
/// [`LOCK_TABLE_PRUNE_THRESHOLD`].
#[derive(Debug, Default)]
pub struct TermLocks {
    table: Mutex<HashMap<TermId, Arc<AsyncMutex<()>>>>,
}

impl TermLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `term_id`.
    pub async fn lock(&self, term_id: TermId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            if table.len() >= LOCK_TABLE_PRUNE_THRESHOLD {
                // Clones are only taken under this mutex, so a count of 1 means idle.
                table.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(table.entry(term_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of lock entries currently tracked.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
