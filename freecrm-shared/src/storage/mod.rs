/// Object storage for invoice attachments
///
/// Objects are addressed by slash-separated keys. Attachments live under
/// `<owner_id>/invoices/<invoice_id>/<file name>`, so every key an API
/// handler builds starts with the session's owner id.
///
/// [`ObjectStore`] is the seam; [`local::LocalObjectStore`] keeps objects on
/// the local filesystem.
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use freecrm_shared::storage::{attachment_key, local::LocalObjectStore, ObjectStore};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalObjectStore::new("./storage");
/// let key = attachment_key(Uuid::new_v4(), Uuid::new_v4(), "devis signé.pdf")?;
///
/// let stored = store.put(&key, Bytes::from_static(b"%PDF-1.7")).await?;
/// println!("{} bytes, sha256 {}", stored.size, stored.sha256);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod local;

/// Longest file name accepted for an attachment
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No object under this key
    #[error("Object not found: {0}")]
    NotFound(String),

    /// An object already exists under this key
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    /// Key or file name is not acceptable
    #[error("Invalid object name: {0}")]
    InvalidName(String),

    /// Underlying I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,

    /// Lowercase hex SHA-256 of the content
    pub sha256: String,
}

/// One entry of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Last key segment
    pub name: String,
    pub key: String,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Flat key/value object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `data` under `key`; refuses to overwrite
    async fn put(&self, key: &str, data: Bytes) -> Result<StoredObject, StorageError>;

    /// Reads the object under `key`
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Lists the objects directly under `prefix`, sorted by name
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Removes the object under `key`
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Removes everything under `prefix` and returns how many objects went
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError>;
}

/// Key prefix holding one invoice's attachments
pub fn attachment_prefix(owner_id: Uuid, invoice_id: Uuid) -> String {
    format!("{}/invoices/{}", owner_id, invoice_id)
}

/// Full key of one attachment, with the file name sanitized
pub fn attachment_key(owner_id: Uuid, invoice_id: Uuid, file_name: &str) -> Result<String, StorageError> {
    Ok(format!(
        "{}/{}",
        attachment_prefix(owner_id, invoice_id),
        sanitize_file_name(file_name)?
    ))
}

/// Turns a user-supplied file name into a single safe key segment
///
/// Path separators and `.`/`..` are refused outright. Remaining characters
/// outside `[A-Za-z0-9._ -]` become `_`.
pub fn sanitize_file_name(raw: &str) -> Result<String, StorageError> {
    let name = raw.trim();

    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidName(raw.to_string()));
    }
    if name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(StorageError::InvalidName(format!(
            "file name longer than {} characters",
            MAX_FILE_NAME_LENGTH
        )));
    }

    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.starts_with('.') {
        return Err(StorageError::InvalidName(raw.to_string()));
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_key_layout() {
        let owner = Uuid::new_v4();
        let invoice = Uuid::new_v4();

        let key = attachment_key(owner, invoice, "facture.pdf").unwrap();
        assert_eq!(key, format!("{}/invoices/{}/facture.pdf", owner, invoice));
        assert!(key.starts_with(&attachment_prefix(owner, invoice)));
    }

    #[test]
    fn test_sanitize_replaces_unusual_characters() {
        assert_eq!(sanitize_file_name("devis signé.pdf").unwrap(), "devis sign_.pdf");
        assert_eq!(sanitize_file_name("  scan (1).png ").unwrap(), "scan _1_.png");
    }

    #[test]
    fn test_sanitize_refuses_traversal() {
        for bad in ["", "   ", ".", "..", "../etc/passwd", "a/b.pdf", "a\\b.pdf", ".hidden"] {
            assert!(
                matches!(sanitize_file_name(bad), Err(StorageError::InvalidName(_))),
                "{:?} should be refused",
                bad
            );
        }
    }

    #[test]
    fn test_sanitize_length_limit() {
        let long = "a".repeat(MAX_FILE_NAME_LENGTH + 1);
        assert!(sanitize_file_name(&long).is_err());
        assert!(sanitize_file_name(&long[1..]).is_ok());
    }
}
