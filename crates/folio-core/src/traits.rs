//! Core traits for folio abstractions.
//!
//! These traits define the interfaces that concrete storage implementations
//! must satisfy, enabling pluggable backends and testability. Request
//! handlers consume them as `dyn` objects.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// DOCUMENT REPOSITORY
// =============================================================================

/// Request for creating a new document.
///
/// `path` and `index` are never supplied by the caller: the path is derived
/// from the parent and the index is assigned max+1 among siblings. Explicit
/// reordering goes through [`DocumentRepository::update_index`].
#[derive(Debug, Clone)]
pub struct CreateDocumentRequest {
    pub key: String,
    pub document_type: DocumentType,
    /// Parent folder (`None` creates a root document).
    pub parent_id: Option<Uuid>,
    /// Tags attached within the creation transaction.
    pub tags: Option<Vec<String>>,
    /// Metadata entries attached within the creation transaction.
    pub metadata: Option<Vec<MetadataEntry>>,
}

/// Partial update of a document's own fields.
///
/// Parentage and path are [`DocumentRepository::move_to`]'s job; only
/// fields present in the request are applied.
#[derive(Debug, Clone, Default)]
pub struct UpdateDocumentRequest {
    pub key: Option<String>,
    pub index: Option<i32>,
}

/// Request for listing documents.
#[derive(Debug, Clone, Default)]
pub struct ListDocumentsRequest {
    /// Maximum results (default 50, capped)
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
    /// Filter by document type
    pub document_type: Option<DocumentType>,
    /// Filter by tag name (inner join through the tag-link table)
    pub tag: Option<String>,
    /// Filter by parent
    pub parent_id: Option<Uuid>,
    /// Restrict to root documents (`parent_id IS NULL`)
    pub only_root: bool,
}

/// Response for listing documents.
///
/// `total` counts all matches before pagination, for client-side paging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<Document>,
    pub total: i64,
}

/// Repository for document tree operations.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Create a document. Derives `path` from the parent, assigns the next
    /// sibling `index`, and prepares content storage for non-folder kinds.
    async fn create(&self, req: CreateDocumentRequest) -> Result<Document>;

    /// Fetch a document with tags, metadata, and ordered children.
    async fn fetch(&self, id: Uuid) -> Result<DocumentFull>;

    /// Fetch by the unique `(path, key)` pair; `path = None` matches roots.
    async fn fetch_by_path_and_key(&self, path: Option<&str>, key: &str) -> Result<DocumentFull>;

    /// List documents with filtering and pagination, ordered by `index`.
    async fn list(&self, req: ListDocumentsRequest) -> Result<ListDocumentsResponse>;

    /// Apply a partial update of `key` and/or `index`.
    async fn update(&self, id: Uuid, req: UpdateDocumentRequest) -> Result<Document>;

    /// Update just the sibling index of a document.
    async fn update_index(&self, id: Uuid, index: i32) -> Result<()>;

    /// Re-parent a document (`None` moves it to the root), recomputing its
    /// path and sibling index and rejecting moves that would create a cycle.
    async fn move_to(&self, id: Uuid, new_parent_id: Option<Uuid>) -> Result<Document>;

    /// Delete a document; descendants and tag/metadata links cascade.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Check if a document exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Repository for tag operations.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a tag if it doesn't exist.
    async fn create(&self, name: &str) -> Result<()>;

    /// List all tags with document counts.
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Attach a tag to a document, creating the tag on first use.
    /// Idempotent: linking an already-linked pair is a no-op.
    async fn add_to_document(&self, document_id: Uuid, tag_name: &str) -> Result<()>;

    /// Detach a tag from a document. Fails with `TagNotFound` if the tag
    /// itself does not exist; detaching an unlinked tag is a no-op.
    async fn remove_from_document(&self, document_id: Uuid, tag_name: &str) -> Result<()>;

    /// Get all tag names for a document.
    async fn get_for_document(&self, document_id: Uuid) -> Result<Vec<String>>;
}

// =============================================================================
// METADATA REPOSITORY
// =============================================================================

/// Repository for per-document key-value metadata.
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Insert or update the value for `(document_id, key)`. Atomic per call.
    async fn upsert(&self, document_id: Uuid, key: &str, value: &str) -> Result<()>;

    /// Get all metadata entries for a document.
    async fn get_for_document(&self, document_id: Uuid) -> Result<Vec<MetadataEntry>>;
}
