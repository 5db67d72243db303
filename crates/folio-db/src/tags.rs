//! Tag repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use folio_core::{defaults, new_v7, Error, Result, Tag, TagRepository};

/// Validate a tag name.
///
/// Rules:
/// - Length between 1-100 characters
/// - Allowed characters: alphanumeric, hyphens (-), underscores (_), forward slashes (/)
/// - No spaces or other special characters
///
/// Returns Ok(()) if valid, Err with message if invalid.
pub fn validate_tag_name(tag: &str) -> std::result::Result<(), String> {
    if tag.is_empty() {
        return Err("Tag name cannot be empty".to_string());
    }
    if tag.len() > defaults::TAG_NAME_MAX_LEN {
        return Err(format!(
            "Tag name must be {} characters or less",
            defaults::TAG_NAME_MAX_LEN
        ));
    }

    let invalid_chars: Vec<char> = tag
        .chars()
        .filter(|c| !c.is_alphanumeric() && *c != '-' && *c != '_' && *c != '/')
        .collect();

    if !invalid_chars.is_empty() {
        let chars_display: String = invalid_chars
            .iter()
            .take(5)
            .map(|c| format!("'{}'", c))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(format!(
            "Tag contains invalid characters: {}. Only alphanumeric characters, hyphens, underscores, and forward slashes are allowed",
            chars_display
        ));
    }

    Ok(())
}

/// Attach a tag to a document within an existing transaction, creating the
/// tag row on first use. Linking an already-linked pair is a no-op.
pub(crate) async fn add_to_document_tx(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    tag_name: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    validate_tag_name(tag_name).map_err(Error::InvalidInput)?;

    // Ensure tag exists
    sqlx::query("INSERT INTO tag (id, name, created_at_utc) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING")
        .bind(new_v7())
        .bind(tag_name)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

    let tag_id: Uuid = sqlx::query_scalar("SELECT id FROM tag WHERE name = $1")
        .bind(tag_name)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

    // Link tag to document
    sqlx::query(
        "INSERT INTO document_tag (document_id, tag_id) VALUES ($1, $2)
         ON CONFLICT (document_id, tag_id) DO NOTHING",
    )
    .bind(document_id)
    .bind(tag_id)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// PostgreSQL implementation of TagRepository.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn create(&self, name: &str) -> Result<()> {
        validate_tag_name(name).map_err(Error::InvalidInput)?;

        sqlx::query(
            "INSERT INTO tag (id, name, created_at_utc) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        )
        .bind(new_v7())
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT
                t.id,
                t.name,
                t.created_at_utc,
                COUNT(dt.document_id) as document_count
            FROM tag t
            LEFT JOIN document_tag dt ON dt.tag_id = t.id
            GROUP BY t.id, t.name, t.created_at_utc
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let tags = rows
            .into_iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
                created_at_utc: row.get("created_at_utc"),
                document_count: row.get("document_count"),
            })
            .collect();

        Ok(tags)
    }

    async fn add_to_document(&self, document_id: Uuid, tag_name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        add_to_document_tx(&mut tx, document_id, tag_name, Utc::now()).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn remove_from_document(&self, document_id: Uuid, tag_name: &str) -> Result<()> {
        let tag_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM tag WHERE name = $1")
            .bind(tag_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        let tag_id = tag_id.ok_or_else(|| Error::TagNotFound(tag_name.to_string()))?;

        // Removing a tag that was never linked is a no-op
        sqlx::query("DELETE FROM document_tag WHERE document_id = $1 AND tag_id = $2")
            .bind(document_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn get_for_document(&self, document_id: Uuid) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT t.name FROM document_tag dt
             JOIN tag t ON t.id = dt.tag_id
             WHERE dt.document_id = $1
             ORDER BY t.name",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let tags = rows.into_iter().map(|row| row.get("name")).collect();
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tag_name_accepts_common_names() {
        assert!(validate_tag_name("tutorial").is_ok());
        assert!(validate_tag_name("release-notes").is_ok());
        assert!(validate_tag_name("team_docs").is_ok());
        assert!(validate_tag_name("area/backend").is_ok());
    }

    #[test]
    fn test_validate_tag_name_rejects_empty() {
        assert!(validate_tag_name("").is_err());
    }

    #[test]
    fn test_validate_tag_name_rejects_spaces() {
        assert!(validate_tag_name("release notes").is_err());
    }

    #[test]
    fn test_validate_tag_name_rejects_overlong() {
        let name = "t".repeat(defaults::TAG_NAME_MAX_LEN + 1);
        assert!(validate_tag_name(&name).is_err());
    }

    #[test]
    fn test_validate_tag_name_error_lists_offenders() {
        let err = validate_tag_name("bad!tag?").unwrap_err();
        assert!(err.contains("'!'"));
        assert!(err.contains("'?'"));
    }
}
