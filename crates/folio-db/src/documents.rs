//! Document repository implementation.
//!
//! Maintains the document tree invariants on every mutation: materialized
//! `path` strings derived from the parent chain, max+1 sibling `index`
//! assignment, and acyclicity checks on re-parenting. Every multi-row
//! mutation runs inside a single transaction; public `_tx` variants expose
//! the composition points.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use folio_core::{
    defaults, new_v7, CreateDocumentRequest, Document, DocumentFull, DocumentRepository,
    DocumentType, Error, ListDocumentsRequest, ListDocumentsResponse, MetadataEntry, Result,
    UpdateDocumentRequest,
};

use crate::content::{ContentStore, FilesystemContentStore};

/// Validate a document key.
///
/// Rules:
/// - Length between 1-255 characters
/// - Must not contain `/` (keys are concatenated into descendant paths)
///
/// Returns Ok(()) if valid, Err with message if invalid.
pub fn validate_document_key(key: &str) -> std::result::Result<(), String> {
    if key.is_empty() {
        return Err("Document key cannot be empty".to_string());
    }
    if key.len() > defaults::KEY_MAX_LEN {
        return Err(format!(
            "Document key must be {} characters or less",
            defaults::KEY_MAX_LEN
        ));
    }
    if key.contains('/') {
        return Err("Document key cannot contain '/'".to_string());
    }
    Ok(())
}

const DOCUMENT_COLUMNS: &str =
    r#"id, path, key, "index", document_type, parent_id, created_at_utc, updated_at_utc"#;

/// Map a database row to a Document.
fn map_row(row: &PgRow) -> Result<Document> {
    let type_str: String = row.get("document_type");
    let document_type = type_str.parse::<DocumentType>().map_err(Error::Internal)?;

    Ok(Document {
        id: row.get("id"),
        path: row.get("path"),
        key: row.get("key"),
        index: row.get("index"),
        document_type,
        parent_id: row.get("parent_id"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    })
}

/// Macro to bind ListDocumentsRequest filter parameters to a query.
///
/// Bind order must match the clause order built in `list_tx`.
macro_rules! bind_list_filters {
    ($query:expr, $req:expr) => {{
        let mut q = $query;
        if let Some(ty) = &$req.document_type {
            q = q.bind(ty.as_str());
        }
        if let Some(pid) = &$req.parent_id {
            q = q.bind(pid);
        }
        if let Some(tag) = &$req.tag {
            q = q.bind(tag);
        }
        q
    }};
}

/// PostgreSQL implementation of DocumentRepository.
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: Pool<Postgres>,
    content: Arc<dyn ContentStore>,
}

impl PgDocumentRepository {
    /// Create a new PgDocumentRepository with the given connection pool.
    ///
    /// Uses a [`FilesystemContentStore`] configured from the environment;
    /// override with [`PgDocumentRepository::with_content_store`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            content: Arc::new(FilesystemContentStore::from_env()),
        }
    }

    /// Replace the content store consulted before non-folder creation.
    pub fn with_content_store(mut self, store: impl ContentStore + 'static) -> Self {
        self.content = Arc::new(store);
        self
    }

    /// Load a bare document row within a transaction.
    async fn fetch_row_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM document WHERE id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(map_row).transpose()
    }

    /// Next sibling index under the given parent (max + 1, starting at 1).
    async fn next_sibling_index(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        parent_id: Option<Uuid>,
    ) -> Result<i32> {
        let max: i32 = match parent_id {
            Some(pid) => sqlx::query_scalar(
                r#"SELECT COALESCE(MAX("index"), 0) FROM document WHERE parent_id = $1"#,
            )
            .bind(pid)
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)?,
            None => sqlx::query_scalar(
                r#"SELECT COALESCE(MAX("index"), 0) FROM document WHERE parent_id IS NULL"#,
            )
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)?,
        };
        Ok(max + 1)
    }

    /// Reject a move whose target parent sits inside the moved document's
    /// own subtree. Walks the ancestor chain upward from the new parent.
    async fn ensure_not_descendant(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        new_parent: &Document,
    ) -> Result<()> {
        let mut cursor = new_parent.parent_id;
        while let Some(ancestor_id) = cursor {
            if ancestor_id == id {
                return Err(Error::InvalidOperation(
                    "new parent is a descendant of the document being moved".to_string(),
                ));
            }
            cursor = sqlx::query_scalar::<_, Option<Uuid>>(
                "SELECT parent_id FROM document WHERE id = $1",
            )
            .bind(ancestor_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .flatten();
        }
        Ok(())
    }

    /// Rewrite the materialized paths of every descendant of `id` from the
    /// subtree root downward. Called after a move or key rename so the path
    /// invariant holds for all rows, not just the touched one.
    async fn refresh_subtree_paths(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<()> {
        sqlx::query(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT id, key, path FROM document WHERE id = $1
                UNION ALL
                SELECT d.id, d.key,
                       CASE WHEN s.path IS NULL THEN s.key
                            ELSE s.path || '/' || s.key END
                FROM document d
                JOIN subtree s ON d.parent_id = s.id
            )
            UPDATE document d
            SET path = s.path
            FROM subtree s
            WHERE d.id = s.id AND d.id <> $1
            "#,
        )
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Attach tags, metadata, and ordered children to a bare document row.
    async fn assemble_full_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        document: Document,
    ) -> Result<DocumentFull> {
        let tags: Vec<String> = sqlx::query(
            "SELECT t.name FROM document_tag dt
             JOIN tag t ON t.id = dt.tag_id
             WHERE dt.document_id = $1
             ORDER BY t.name",
        )
        .bind(document.id)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?
        .into_iter()
        .map(|r| r.get("name"))
        .collect();

        let metadata: Vec<MetadataEntry> = sqlx::query(
            "SELECT key, value FROM document_metadata WHERE document_id = $1 ORDER BY key",
        )
        .bind(document.id)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?
        .into_iter()
        .map(|r| MetadataEntry {
            key: r.get("key"),
            value: r.get("value"),
        })
        .collect();

        let children = sqlx::query(&format!(
            r#"SELECT {} FROM document WHERE parent_id = $1 ORDER BY "index" ASC"#,
            DOCUMENT_COLUMNS
        ))
        .bind(document.id)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?
        .iter()
        .map(map_row)
        .collect::<Result<Vec<_>>>()?;

        Ok(DocumentFull {
            document,
            tags,
            metadata,
            children,
        })
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn create(&self, req: CreateDocumentRequest) -> Result<Document> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let doc = self.create_tx(&mut tx, req).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(doc)
    }

    async fn fetch(&self, id: Uuid) -> Result<DocumentFull> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self.fetch_tx(&mut tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }

    async fn fetch_by_path_and_key(&self, path: Option<&str>, key: &str) -> Result<DocumentFull> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self.fetch_by_path_and_key_tx(&mut tx, path, key).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }

    async fn list(&self, req: ListDocumentsRequest) -> Result<ListDocumentsResponse> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self.list_tx(&mut tx, req).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }

    async fn update(&self, id: Uuid, req: UpdateDocumentRequest) -> Result<Document> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let doc = self.update_tx(&mut tx, id, req).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(doc)
    }

    async fn update_index(&self, id: Uuid, index: i32) -> Result<()> {
        if index < 0 {
            return Err(Error::InvalidInput(
                "document index cannot be negative".to_string(),
            ));
        }
        let result = sqlx::query(
            r#"UPDATE document SET "index" = $1, updated_at_utc = $2 WHERE id = $3"#,
        )
        .bind(index)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::DocumentNotFound(id));
        }
        Ok(())
    }

    async fn move_to(&self, id: Uuid, new_parent_id: Option<Uuid>) -> Result<Document> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let doc = self.move_tx(&mut tx, id, new_parent_id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(doc)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.delete_tx(&mut tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM document WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(exists)
    }
}

/// Transaction-aware variants.
///
/// These methods accept an existing transaction, allowing multiple
/// repository operations to be composed within a single database
/// transaction.
impl PgDocumentRepository {
    /// Create a document within an existing transaction.
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        req: CreateDocumentRequest,
    ) -> Result<Document> {
        validate_document_key(&req.key).map_err(Error::InvalidInput)?;

        let id = new_v7();
        let now = Utc::now();

        let (path, parent_id) = match req.parent_id {
            Some(pid) => {
                let parent = self
                    .fetch_row_tx(tx, pid)
                    .await?
                    .ok_or(Error::DocumentNotFound(pid))?;
                if parent.document_type != DocumentType::Folder {
                    return Err(Error::InvalidOperation(format!(
                        "parent document {} is not a folder",
                        pid
                    )));
                }
                (Some(parent.child_path()), Some(pid))
            }
            None => (None, None),
        };

        // Non-folder documents carry content; the location must exist
        // before the row does, and a failure aborts the creation.
        if req.document_type != DocumentType::Folder {
            self.content.prepare(id).await?;
        }

        let index = self.next_sibling_index(tx, parent_id).await?;

        sqlx::query(
            r#"INSERT INTO document (id, path, key, "index", document_type, parent_id, created_at_utc, updated_at_utc)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $7)"#,
        )
        .bind(id)
        .bind(&path)
        .bind(&req.key)
        .bind(index)
        .bind(req.document_type.as_str())
        .bind(parent_id)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        if let Some(tags) = &req.tags {
            for tag in tags {
                crate::tags::add_to_document_tx(tx, id, tag, now).await?;
            }
        }
        if let Some(entries) = &req.metadata {
            for entry in entries {
                crate::metadata::upsert_tx(tx, id, &entry.key, &entry.value, now).await?;
            }
        }

        debug!(
            subsystem = "db",
            component = "documents",
            op = "create",
            document_id = %id,
            document_type = %req.document_type,
            "Created document"
        );

        Ok(Document {
            id,
            path,
            key: req.key,
            index,
            document_type: req.document_type,
            parent_id,
            created_at_utc: now,
            updated_at_utc: now,
        })
    }

    /// Fetch a document with associations within an existing transaction.
    pub async fn fetch_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<DocumentFull> {
        let document = self
            .fetch_row_tx(tx, id)
            .await?
            .ok_or(Error::DocumentNotFound(id))?;
        self.assemble_full_tx(tx, document).await
    }

    /// Fetch by `(path, key)` within an existing transaction.
    pub async fn fetch_by_path_and_key_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        path: Option<&str>,
        key: &str,
    ) -> Result<DocumentFull> {
        let row = match path {
            Some(p) => {
                sqlx::query(&format!(
                    "SELECT {} FROM document WHERE path = $1 AND key = $2",
                    DOCUMENT_COLUMNS
                ))
                .bind(p)
                .bind(key)
                .fetch_optional(&mut **tx)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM document WHERE path IS NULL AND key = $1",
                    DOCUMENT_COLUMNS
                ))
                .bind(key)
                .fetch_optional(&mut **tx)
                .await
            }
        }
        .map_err(Error::Database)?;

        let document = row
            .as_ref()
            .map(map_row)
            .transpose()?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "document with path {:?} and key '{}'",
                    path, key
                ))
            })?;

        self.assemble_full_tx(tx, document).await
    }

    /// List documents within an existing transaction.
    ///
    /// Computes the total match count before applying pagination; the page
    /// itself is ordered by ascending sibling index.
    pub async fn list_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        req: ListDocumentsRequest,
    ) -> Result<ListDocumentsResponse> {
        let limit = req
            .limit
            .unwrap_or(defaults::PAGE_LIMIT)
            .min(defaults::PAGE_LIMIT_MAX);
        let offset = req.offset.unwrap_or(defaults::PAGE_OFFSET);

        let mut filters = String::new();
        let mut param_idx = 1;

        if req.document_type.is_some() {
            filters.push_str(&format!("AND d.document_type = ${} ", param_idx));
            param_idx += 1;
        }
        if req.parent_id.is_some() {
            filters.push_str(&format!("AND d.parent_id = ${} ", param_idx));
            param_idx += 1;
        }
        if req.only_root {
            filters.push_str("AND d.parent_id IS NULL ");
        }
        if req.tag.is_some() {
            filters.push_str(&format!(
                "AND EXISTS (SELECT 1 FROM document_tag dt JOIN tag t ON t.id = dt.tag_id \
                 WHERE dt.document_id = d.id AND t.name = ${}) ",
                param_idx
            ));
            param_idx += 1;
        }

        // Count total before pagination
        let count_query = format!("SELECT COUNT(*) FROM document d WHERE TRUE {}", filters);
        let total: i64 = {
            let q = sqlx::query_scalar(&count_query);
            let q = bind_list_filters!(q, req);
            q.fetch_one(&mut **tx).await.map_err(Error::Database)?
        };

        let page_query = format!(
            r#"SELECT d.id, d.path, d.key, d."index", d.document_type, d.parent_id,
                      d.created_at_utc, d.updated_at_utc
               FROM document d
               WHERE TRUE {}ORDER BY d."index" ASC LIMIT ${} OFFSET ${}"#,
            filters,
            param_idx,
            param_idx + 1
        );

        let rows = {
            let mut q = sqlx::query(&page_query);
            q = bind_list_filters!(q, req);
            q = q.bind(limit).bind(offset);
            q.fetch_all(&mut **tx).await.map_err(Error::Database)?
        };

        let documents = rows.iter().map(map_row).collect::<Result<Vec<_>>>()?;

        Ok(ListDocumentsResponse { documents, total })
    }

    /// Apply a partial update within an existing transaction.
    ///
    /// A key change rewrites descendant paths, which embed this key.
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        req: UpdateDocumentRequest,
    ) -> Result<Document> {
        let current = self
            .fetch_row_tx(tx, id)
            .await?
            .ok_or(Error::DocumentNotFound(id))?;

        if let Some(key) = &req.key {
            validate_document_key(key).map_err(Error::InvalidInput)?;
        }
        if let Some(index) = req.index {
            if index < 0 {
                return Err(Error::InvalidInput(
                    "document index cannot be negative".to_string(),
                ));
            }
        }

        let key_changed = req.key.as_ref().is_some_and(|k| *k != current.key);
        let now = Utc::now();

        // $1 = now, $2 = id, then dynamic params start at $3
        let mut updates = vec!["updated_at_utc = $1".to_string()];
        let mut param_idx = 3;
        if req.key.is_some() {
            updates.push(format!("key = ${}", param_idx));
            param_idx += 1;
        }
        if req.index.is_some() {
            updates.push(format!(r#""index" = ${}"#, param_idx));
        }

        let query = format!("UPDATE document SET {} WHERE id = $2", updates.join(", "));
        let mut q = sqlx::query(&query).bind(now).bind(id);
        if let Some(key) = &req.key {
            q = q.bind(key);
        }
        if let Some(index) = req.index {
            q = q.bind(index);
        }
        q.execute(&mut **tx).await.map_err(Error::Database)?;

        if key_changed {
            self.refresh_subtree_paths(tx, id).await?;
        }

        self.fetch_row_tx(tx, id)
            .await?
            .ok_or(Error::DocumentNotFound(id))
    }

    /// Move a document to a new parent within an existing transaction.
    pub async fn move_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> Result<Document> {
        let document = self
            .fetch_row_tx(tx, id)
            .await?
            .ok_or(Error::DocumentNotFound(id))?;

        let path = match new_parent_id {
            Some(pid) => {
                let parent = self
                    .fetch_row_tx(tx, pid)
                    .await?
                    .ok_or(Error::DocumentNotFound(pid))?;

                if parent.document_type != DocumentType::Folder {
                    return Err(Error::InvalidOperation(format!(
                        "parent document {} is not a folder",
                        pid
                    )));
                }
                if pid == id {
                    return Err(Error::InvalidOperation(
                        "document cannot be its own parent".to_string(),
                    ));
                }
                self.ensure_not_descendant(tx, id, &parent).await?;

                Some(parent.child_path())
            }
            None => None,
        };

        let index = self.next_sibling_index(tx, new_parent_id).await?;
        let now = Utc::now();

        sqlx::query(
            r#"UPDATE document SET parent_id = $1, path = $2, "index" = $3, updated_at_utc = $4 WHERE id = $5"#,
        )
        .bind(new_parent_id)
        .bind(&path)
        .bind(index)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        // The moved document's descendants carry paths derived from it.
        self.refresh_subtree_paths(tx, id).await?;

        debug!(
            subsystem = "db",
            component = "documents",
            op = "move",
            document_id = %id,
            parent_id = ?new_parent_id,
            "Moved document"
        );

        Ok(Document {
            parent_id: new_parent_id,
            path,
            index,
            updated_at_utc: now,
            ..document
        })
    }

    /// Delete a document within an existing transaction.
    ///
    /// Descendants, tag links, and metadata rows go with it via
    /// `ON DELETE CASCADE`.
    pub async fn delete_tx(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM document WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut **tx)
                .await
                .map_err(Error::Database)?;
        if !exists {
            return Err(Error::DocumentNotFound(id));
        }

        sqlx::query("DELETE FROM document WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "documents",
            op = "delete",
            document_id = %id,
            "Deleted document"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_document_key_accepts_plain_segments() {
        assert!(validate_document_key("docs").is_ok());
        assert!(validate_document_key("intro-page_2").is_ok());
    }

    #[test]
    fn test_validate_document_key_rejects_empty() {
        assert!(validate_document_key("").is_err());
    }

    #[test]
    fn test_validate_document_key_rejects_slash() {
        assert!(validate_document_key("docs/intro").is_err());
    }

    #[test]
    fn test_validate_document_key_rejects_overlong() {
        let key = "k".repeat(defaults::KEY_MAX_LEN + 1);
        assert!(validate_document_key(&key).is_err());
    }
}
