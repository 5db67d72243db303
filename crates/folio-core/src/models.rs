//! Core data models for the folio document service.
//!
//! These types are shared across all folio crates and represent the
//! document tree (materialized paths, sibling ordering), tags, and
//! per-document metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// DOCUMENT TYPES
// =============================================================================

/// Kind of node in the document tree.
///
/// Only `Folder` documents may have children; all other kinds carry content
/// in the external content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    Folder,
    Page,
    Link,
    Snippet,
    Email,
}

impl DocumentType {
    /// Canonical database representation (uppercase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "FOLDER",
            Self::Page => "PAGE",
            Self::Link => "LINK",
            Self::Snippet => "SNIPPET",
            Self::Email => "EMAIL",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FOLDER" => Ok(Self::Folder),
            "PAGE" => Ok(Self::Page),
            "LINK" => Ok(Self::Link),
            "SNIPPET" => Ok(Self::Snippet),
            "EMAIL" => Ok(Self::Email),
            _ => Err(format!("Invalid document type: {}", s)),
        }
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    /// Materialized concatenation of ancestor keys ("docs/guides").
    /// `None` for root documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Path segment, unique within `(path)`.
    pub key: String,
    /// Sibling sort position; assigned max+1 among rows sharing `parent_id`.
    pub index: i32,
    pub document_type: DocumentType,
    /// Parent folder (`None` = root).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl Document {
    /// The `path` value carried by children of this document.
    ///
    /// Root parents contribute just their key; nested parents append their
    /// key to their own path.
    pub fn child_path(&self) -> String {
        match &self.path {
            Some(path) => format!("{}/{}", path, self.key),
            None => self.key.clone(),
        }
    }
}

/// Complete document with associations, as returned by fetch operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFull {
    pub document: Document,
    pub tags: Vec<String>,
    pub metadata: Vec<MetadataEntry>,
    /// Direct children ordered by ascending `index`.
    pub children: Vec<Document>,
}

// =============================================================================
// TAG / METADATA TYPES
// =============================================================================

/// A tag attachable to any number of documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at_utc: DateTime<Utc>,
    /// Number of documents carrying this tag (computed)
    #[serde(default)]
    pub document_count: i64,
}

/// A key-value metadata entry belonging to one document.
///
/// `(document_id, key)` is unique; values are upserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: Option<&str>, key: &str) -> Document {
        Document {
            id: Uuid::nil(),
            path: path.map(String::from),
            key: key.to_string(),
            index: 1,
            document_type: DocumentType::Folder,
            parent_id: None,
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        }
    }

    #[test]
    fn test_child_path_of_root_parent() {
        assert_eq!(doc(None, "docs").child_path(), "docs");
    }

    #[test]
    fn test_child_path_of_nested_parent() {
        assert_eq!(doc(Some("docs"), "guides").child_path(), "docs/guides");
        assert_eq!(
            doc(Some("docs/guides"), "admin").child_path(),
            "docs/guides/admin"
        );
    }

    #[test]
    fn test_document_type_roundtrip() {
        for ty in [
            DocumentType::Folder,
            DocumentType::Page,
            DocumentType::Link,
            DocumentType::Snippet,
            DocumentType::Email,
        ] {
            let parsed: DocumentType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn test_document_type_parse_is_case_insensitive() {
        assert_eq!("folder".parse::<DocumentType>().unwrap(), DocumentType::Folder);
        assert_eq!("Page".parse::<DocumentType>().unwrap(), DocumentType::Page);
    }

    #[test]
    fn test_document_type_parse_rejects_unknown() {
        assert!("DIRECTORY".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_document_type_serde_uses_uppercase() {
        let json = serde_json::to_string(&DocumentType::Snippet).unwrap();
        assert_eq!(json, "\"SNIPPET\"");
        let back: DocumentType = serde_json::from_str("\"EMAIL\"").unwrap();
        assert_eq!(back, DocumentType::Email);
    }

    #[test]
    fn test_document_serde_skips_null_path_and_parent() {
        let d = doc(None, "root");
        let json = serde_json::to_string(&d).unwrap();
        assert!(!json.contains("\"path\""));
        assert!(!json.contains("\"parent_id\""));
    }
}
