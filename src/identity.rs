//! Content-derived document identity and duplicate detection

use crate::error::{Error, Result};
use crate::store::MetadataStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Lowercase hex SHA-256 of a document's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap an identifier read back from a store or the command line
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the identifier for a document from its exact byte content.
///
/// Names, paths and upload times play no part: byte-identical uploads always map to
/// the same identifier.
pub fn derive_document_id(content: &[u8]) -> DocumentId {
    let mut hasher = Sha256::new();
    hasher.update(content);
    DocumentId(format!("{:x}", hasher.finalize()))
}

/// Reject an upload whose identity is already present in the metadata store
pub async fn check_duplicate(metadata: &dyn MetadataStore, id: &DocumentId) -> Result<()> {
    match metadata.get_document(id).await? {
        Some(existing) => Err(Error::DuplicateDocument(format!(
            "{} (first uploaded as {})",
            id, existing.provenance.source_name
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;
    use crate::store::{Document, Facets, Provenance};

    #[test]
    fn test_known_digest() {
        let id = derive_document_id(b"abc");
        assert_eq!(
            id.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_identical_bytes_same_id() {
        let a = derive_document_id(b"%PDF-1.4 same content");
        let b = derive_document_id(b"%PDF-1.4 same content");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_bytes_different_id() {
        let a = derive_document_id(b"%PDF-1.4 one");
        let b = derive_document_id(b"%PDF-1.4 two");
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[tokio::test]
    async fn test_check_duplicate() {
        let store = MemoryStore::new();
        let id = derive_document_id(b"%PDF-1.4 report");
        assert!(check_duplicate(&store, &id).await.is_ok());

        let doc = Document::new(
            id.clone(),
            Provenance::new("report.pdf", "report.pdf", "/docs"),
            Facets::default(),
        );
        store.upsert_document(&doc).await.unwrap();

        let err = check_duplicate(&store, &id).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateDocument(_)));
        assert!(err.to_string().contains("report.pdf"));
    }
}
