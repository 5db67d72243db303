//! Metadata repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use folio_core::{new_v7, Error, MetadataEntry, MetadataRepository, Result};

const UPSERT_SQL: &str = r#"
INSERT INTO document_metadata (id, document_id, key, value, created_at_utc, updated_at_utc)
VALUES ($1, $2, $3, $4, $5, $5)
ON CONFLICT (document_id, key)
DO UPDATE SET value = EXCLUDED.value, updated_at_utc = EXCLUDED.updated_at_utc
"#;

/// Upsert a metadata entry within an existing transaction.
pub(crate) async fn upsert_tx(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    key: &str,
    value: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(UPSERT_SQL)
        .bind(new_v7())
        .bind(document_id)
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

/// PostgreSQL implementation of MetadataRepository.
#[derive(Clone)]
pub struct PgMetadataRepository {
    pool: Pool<Postgres>,
}

impl PgMetadataRepository {
    /// Create a new PgMetadataRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataRepository for PgMetadataRepository {
    async fn upsert(&self, document_id: Uuid, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidInput(
                "Metadata key cannot be empty".to_string(),
            ));
        }

        // Single conflict-clause statement, atomic per call
        sqlx::query(UPSERT_SQL)
            .bind(new_v7())
            .bind(document_id)
            .bind(key)
            .bind(value)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn get_for_document(&self, document_id: Uuid) -> Result<Vec<MetadataEntry>> {
        let rows = sqlx::query(
            "SELECT key, value FROM document_metadata WHERE document_id = $1 ORDER BY key",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let entries = rows
            .into_iter()
            .map(|row| MetadataEntry {
                key: row.get("key"),
                value: row.get("value"),
            })
            .collect();

        Ok(entries)
    }
}
