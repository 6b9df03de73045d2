//! PostgreSQL shadow record store.
//!
//! Shadow records live in `term_meta_record`, unique on `term_id`, and their
//! attributes in `term_meta_value` (one row per value, row id order is
//! insertion order). Writes to a record take a row lock on it so that a
//! concurrent prune cannot delete the record underneath them.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;

use termeta_core::{
    defaults, shadow_record_name_with_prefix, Error, RecordId, Result, ShadowRecord,
    ShadowRecordStore, TermId, TermMeta,
};

/// PostgreSQL implementation of ShadowRecordStore.
#[derive(Clone)]
pub struct PgShadowRecordStore {
    pool: Pool<Postgres>,
    prefix: String,
}

impl PgShadowRecordStore {
    /// Create a new PgShadowRecordStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            prefix: defaults::RECORD_PREFIX.to_string(),
        }
    }

    /// Use a custom shadow record name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Fetch the full shadow record of a term.
    pub async fn get_record(&self, term_id: TermId) -> Result<Option<ShadowRecord>> {
        let row = sqlx::query(
            "SELECT id, term_id, name, created_at_utc FROM term_meta_record
             WHERE term_id = $1 ORDER BY id LIMIT 1",
        )
        .bind(term_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| ShadowRecord {
            id: row.get("id"),
            term_id: row.get("term_id"),
            name: row.get("name"),
            created_at_utc: row.get("created_at_utc"),
        }))
    }

    /// Lock a record row for the rest of the transaction.
    async fn lock_record(tx: &mut Transaction<'_, Postgres>, record_id: RecordId) -> Result<()> {
        sqlx::query("SELECT id FROM term_meta_record WHERE id = $1 FOR UPDATE")
            .bind(record_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .map(|_| ())
            .ok_or(Error::ShadowRecordMissing(record_id))
    }

    async fn insert_value(
        tx: &mut Transaction<'_, Postgres>,
        record_id: RecordId,
        key: &str,
        value: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO term_meta_value (record_id, meta_key, meta_value) VALUES ($1, $2, $3)",
        )
        .bind(record_id)
        .bind(key)
        .bind(value)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

#[async_trait]
impl ShadowRecordStore for PgShadowRecordStore {
    async fn find_record(&self, term_id: TermId) -> Result<Option<RecordId>> {
        let row = sqlx::query("SELECT id FROM term_meta_record WHERE term_id = $1 ORDER BY id LIMIT 1")
            .bind(term_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|row| row.get("id")))
    }

    async fn ensure_record(&self, term_id: TermId) -> Result<RecordId> {
        // The no-op update makes RETURNING yield the existing id on conflict.
        let row = sqlx::query(
            r#"
            INSERT INTO term_meta_record (term_id, name, created_at_utc)
            VALUES ($1, $2, $3)
            ON CONFLICT (term_id) DO UPDATE SET term_id = EXCLUDED.term_id
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(term_id)
        .bind(shadow_record_name_with_prefix(&self.prefix, term_id))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let id: RecordId = row.get("id");
        if row.get::<bool, _>("inserted") {
            debug!(
                subsystem = "db",
                component = "records",
                op = "ensure_record",
                term_id,
                record_id = id,
                "Shadow record created"
            );
        }
        Ok(id)
    }

    async fn delete_record(&self, record_id: RecordId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM term_meta_record WHERE id = $1")
            .bind(record_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_record_if_empty(&self, record_id: RecordId) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Wait for in-flight writers, then re-check emptiness in a fresh snapshot.
        match Self::lock_record(&mut tx, record_id).await {
            Ok(()) => {}
            Err(Error::ShadowRecordMissing(_)) => return Ok(false),
            Err(e) => return Err(e),
        }

        let has_values: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM term_meta_value WHERE record_id = $1)",
        )
        .bind(record_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if has_values {
            tx.commit().await.map_err(Error::Database)?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM term_meta_record WHERE id = $1")
            .bind(record_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        debug!(
            subsystem = "db",
            component = "records",
            op = "prune",
            record_id,
            "Empty shadow record deleted"
        );
        Ok(true)
    }

    async fn get_values(&self, record_id: RecordId, key: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT meta_value FROM term_meta_value
             WHERE record_id = $1 AND meta_key = $2 ORDER BY id",
        )
        .bind(record_id)
        .bind(key)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|row| row.get("meta_value")).collect())
    }

    async fn get_all(&self, record_id: RecordId) -> Result<TermMeta> {
        let rows = sqlx::query(
            "SELECT meta_key, meta_value FROM term_meta_value WHERE record_id = $1 ORDER BY id",
        )
        .bind(record_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.get::<String, _>("meta_key"),
                    row.get::<String, _>("meta_value"),
                )
            })
            .collect())
    }

    async fn add_value(
        &self,
        record_id: RecordId,
        key: &str,
        value: &str,
        unique: bool,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        Self::lock_record(&mut tx, record_id).await?;

        if unique {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM term_meta_value WHERE record_id = $1 AND meta_key = $2)",
            )
            .bind(record_id)
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;

            if exists {
                tx.rollback().await.map_err(Error::Database)?;
                return Ok(false);
            }
        }

        Self::insert_value(&mut tx, record_id, key, value).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(true)
    }

    async fn update_values(
        &self,
        record_id: RecordId,
        key: &str,
        value: &str,
        prev_value: Option<&str>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        Self::lock_record(&mut tx, record_id).await?;

        let first_id: Option<i64> = sqlx::query_scalar(
            "SELECT MIN(id) FROM term_meta_value WHERE record_id = $1 AND meta_key = $2",
        )
        .bind(record_id)
        .bind(key)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let Some(first_id) = first_id else {
            Self::insert_value(&mut tx, record_id, key, value).await?;
            tx.commit().await.map_err(Error::Database)?;
            return Ok(true);
        };

        let updated = match prev_value {
            Some(prev) => {
                let result = sqlx::query(
                    "UPDATE term_meta_value SET meta_value = $3
                     WHERE record_id = $1 AND meta_key = $2 AND meta_value = $4",
                )
                .bind(record_id)
                .bind(key)
                .bind(value)
                .bind(prev)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
                result.rows_affected() > 0
            }
            None => {
                sqlx::query("UPDATE term_meta_value SET meta_value = $2 WHERE id = $1")
                    .bind(first_id)
                    .bind(value)
                    .execute(&mut *tx)
                    .await
                    .map_err(Error::Database)?;
                sqlx::query(
                    "DELETE FROM term_meta_value WHERE record_id = $1 AND meta_key = $2 AND id <> $3",
                )
                .bind(record_id)
                .bind(key)
                .bind(first_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
                true
            }
        };

        tx.commit().await.map_err(Error::Database)?;
        Ok(updated)
    }

    async fn delete_values(
        &self,
        record_id: RecordId,
        key: &str,
        value: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM term_meta_value
             WHERE record_id = $1 AND meta_key = $2 AND ($3::TEXT IS NULL OR meta_value = $3)",
        )
        .bind(record_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
