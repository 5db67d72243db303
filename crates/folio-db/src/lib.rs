//! # folio-db
//!
//! PostgreSQL database layer for the folio document service.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for documents, tags, and metadata
//! - Materialized-path maintenance for the document tree
//! - A filesystem content store for non-folder documents
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_db::{CreateDocumentRequest, Database, DocumentRepository, DocumentType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/folio").await?;
//!
//!     let folder = db.documents.create(CreateDocumentRequest {
//!         key: "docs".to_string(),
//!         document_type: DocumentType::Folder,
//!         parent_id: None,
//!         tags: None,
//!         metadata: None,
//!     }).await?;
//!
//!     println!("Created folder: {}", folder.id);
//!     Ok(())
//! }
//! ```

pub mod content;
pub mod documents;
pub mod metadata;
pub mod pool;
pub mod tags;

// Test fixtures for integration tests
// Note: always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use folio_core::*;

// Re-export repository implementations
pub use content::{ContentStore, FilesystemContentStore};
pub use documents::{validate_document_key, PgDocumentRepository};
pub use metadata::PgMetadataRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use tags::{validate_tag_name, PgTagRepository};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Document repository for tree CRUD operations.
    pub documents: PgDocumentRepository,
    /// Tag repository for many-to-many tagging.
    pub tags: PgTagRepository,
    /// Metadata repository for per-document key-value pairs.
    pub metadata: PgMetadataRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    ///
    /// The document repository starts with a [`FilesystemContentStore`]
    /// configured from the environment; see [`Database::with_content_store`].
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            documents: PgDocumentRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            metadata: PgMetadataRepository::new(pool.clone()),
            pool,
        }
    }

    /// Replace the content store used for non-folder document creation.
    pub fn with_content_store(mut self, store: impl ContentStore + 'static) -> Self {
        self.documents = self.documents.with_content_store(store);
        self
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
