//! Integration tests for filtered, paginated document listing.
//!
//! Requires a dedicated, migrated Postgres; run single-threaded:
//! `cargo test -p folio-db -- --ignored --test-threads=1`

use folio_db::test_fixtures::TestDatabase;
use folio_db::{DocumentRepository, DocumentType, ListDocumentsRequest, TagRepository};

#[tokio::test]
#[ignore = "requires a migrated Postgres test database"]
async fn test_list_returns_total_beyond_page() {
    let test_db = TestDatabase::new().await;
    test_db.reset().await;

    let parent = test_db.create_folder("parent", None).await;
    for i in 1..=5 {
        test_db
            .create_page(&format!("page-{}", i), Some(parent.id))
            .await;
    }

    let resp = test_db
        .db
        .documents
        .list(ListDocumentsRequest {
            limit: Some(2),
            parent_id: Some(parent.id),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(resp.total, 5);
    assert_eq!(resp.documents.len(), 2);
    assert_eq!(resp.documents[0].key, "page-1");
    assert_eq!(resp.documents[1].key, "page-2");
}

#[tokio::test]
#[ignore = "requires a migrated Postgres test database"]
async fn test_list_offset_pages_through_results() {
    let test_db = TestDatabase::new().await;
    test_db.reset().await;

    let parent = test_db.create_folder("parent", None).await;
    for i in 1..=5 {
        test_db
            .create_page(&format!("page-{}", i), Some(parent.id))
            .await;
    }

    let resp = test_db
        .db
        .documents
        .list(ListDocumentsRequest {
            limit: Some(2),
            offset: Some(4),
            parent_id: Some(parent.id),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(resp.total, 5);
    assert_eq!(resp.documents.len(), 1);
    assert_eq!(resp.documents[0].key, "page-5");
}

#[tokio::test]
#[ignore = "requires a migrated Postgres test database"]
async fn test_list_filters_by_type() {
    let test_db = TestDatabase::new().await;
    test_db.reset().await;

    test_db.create_folder("folder-a", None).await;
    test_db.create_folder("folder-b", None).await;
    test_db.create_page("page-a", None).await;

    let resp = test_db
        .db
        .documents
        .list(ListDocumentsRequest {
            document_type: Some(DocumentType::Folder),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(resp.total, 2);
    assert!(resp
        .documents
        .iter()
        .all(|d| d.document_type == DocumentType::Folder));
}

#[tokio::test]
#[ignore = "requires a migrated Postgres test database"]
async fn test_list_filters_by_parent_and_only_root() {
    let test_db = TestDatabase::new().await;
    test_db.reset().await;

    let docs = test_db.create_folder("docs", None).await;
    test_db.create_page("intro", Some(docs.id)).await;
    test_db.create_page("faq", Some(docs.id)).await;
    test_db.create_page("landing", None).await;

    let children = test_db
        .db
        .documents
        .list(ListDocumentsRequest {
            parent_id: Some(docs.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(children.total, 2);

    let roots = test_db
        .db
        .documents
        .list(ListDocumentsRequest {
            only_root: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(roots.total, 2);
    assert!(roots.documents.iter().all(|d| d.parent_id.is_none()));
}

#[tokio::test]
#[ignore = "requires a migrated Postgres test database"]
async fn test_list_filters_by_tag() {
    let test_db = TestDatabase::new().await;
    test_db.reset().await;

    let tagged = test_db.create_page("tagged", None).await;
    test_db.create_page("untagged", None).await;
    test_db
        .db
        .tags
        .add_to_document(tagged.id, "featured")
        .await
        .unwrap();

    let resp = test_db
        .db
        .documents
        .list(ListDocumentsRequest {
            tag: Some("featured".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(resp.total, 1);
    assert_eq!(resp.documents[0].id, tagged.id);
}

#[tokio::test]
#[ignore = "requires a migrated Postgres test database"]
async fn test_list_combines_filters() {
    let test_db = TestDatabase::new().await;
    test_db.reset().await;

    let folder = test_db.create_folder("folder", None).await;
    let page = test_db.create_page("page", None).await;
    test_db
        .db
        .tags
        .add_to_document(folder.id, "shared")
        .await
        .unwrap();
    test_db
        .db
        .tags
        .add_to_document(page.id, "shared")
        .await
        .unwrap();

    let resp = test_db
        .db
        .documents
        .list(ListDocumentsRequest {
            document_type: Some(DocumentType::Page),
            tag: Some("shared".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(resp.total, 1);
    assert_eq!(resp.documents[0].id, page.id);
}

#[tokio::test]
#[ignore = "requires a migrated Postgres test database"]
async fn test_list_orders_by_index() {
    let test_db = TestDatabase::new().await;
    test_db.reset().await;

    let parent = test_db.create_folder("parent", None).await;
    let first = test_db.create_page("first", Some(parent.id)).await;
    let second = test_db.create_page("second", Some(parent.id)).await;

    // Reorder: first goes behind second
    test_db.db.documents.update_index(first.id, 9).await.unwrap();

    let resp = test_db
        .db
        .documents
        .list(ListDocumentsRequest {
            parent_id: Some(parent.id),
            ..Default::default()
        })
        .await
        .unwrap();

    let ids: Vec<_> = resp.documents.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}
