//! Content-storage collaborator for non-folder documents.
//!
//! Folders exist only as tree structure; every other document kind carries
//! content that lives outside the database. The document repository calls
//! [`ContentStore::prepare`] before inserting a non-folder row so a document
//! never exists without a writable content location; a prepare failure
//! aborts the creation transaction.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use folio_core::Result;

/// Environment variable overriding the content storage location.
pub const STORAGE_PATH_ENV: &str = "DOCUMENT_STORAGE_PATH";

/// Default location for document content when the env var is unset.
pub const DEFAULT_STORAGE_PATH: &str = "./storage/documents";

/// Storage collaborator that provides content locations for documents.
///
/// Allows abstracting over filesystem, object-store, or in-memory backends.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Ensure a writable location exists for the document's content.
    async fn prepare(&self, document_id: Uuid) -> Result<()>;
}

/// Filesystem content store.
///
/// Content for a document lives at `{base_path}/{document_id}`.
pub struct FilesystemContentStore {
    base_path: PathBuf,
}

impl FilesystemContentStore {
    /// Create a new filesystem store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Create a store from `DOCUMENT_STORAGE_PATH`, falling back to
    /// [`DEFAULT_STORAGE_PATH`].
    pub fn from_env() -> Self {
        let base = std::env::var(STORAGE_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_STORAGE_PATH.to_string());
        Self::new(base)
    }

    /// The path document content is stored at.
    pub fn content_path(&self, document_id: Uuid) -> PathBuf {
        self.base_path.join(document_id.to_string())
    }

    /// The root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl ContentStore for FilesystemContentStore {
    async fn prepare(&self, document_id: Uuid) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        debug!(
            subsystem = "content",
            document_id = %document_id,
            base_path = %self.base_path.display(),
            "content location ready"
        );
        Ok(())
    }
}
