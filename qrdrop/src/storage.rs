//! Content store: uploaded file bytes, keyed by batch and filename.
//!
//! Keys are batch-scoped (`{batch_id}/{filename}`), so two batches can hold files with the same
//! name without overwriting each other. Re-uploading a name inside one batch replaces its bytes.

use crate::types::BatchId;
use async_trait::async_trait;
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Error, Debug)]
pub enum StorageError {
    /// Nothing is stored under the key
    #[error("File {key} not found")]
    NotFound { key: String },

    /// The filename cannot be used as a storage key
    #[error("Invalid filename '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Longest filename, in bytes, that common filesystems accept for one path component.
pub const MAX_FILENAME_BYTES: usize = 255;

/// Check that an uploaded filename is a single, plain path component.
pub fn validate_filename(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("filename is empty")
    } else if name.len() > MAX_FILENAME_BYTES {
        Some("filename is longer than 255 bytes")
    } else if name == "." || name == ".." {
        Some("filename is a relative path")
    } else if name.contains(['/', '\\']) {
        Some("filename contains a path separator")
    } else if name.contains('\0') {
        Some("filename contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StorageError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Location of one file in the content store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey {
    batch_id: BatchId,
    filename: String,
}

impl ContentKey {
    pub fn new(batch_id: BatchId, filename: &str) -> Result<Self> {
        validate_filename(filename)?;
        Ok(Self {
            batch_id,
            filename: filename.to_string(),
        })
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.batch_id.to_string()).join(&self.filename)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.batch_id, self.filename)
    }
}

/// Trait for content storage backends
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store content under the key, replacing anything already there
    async fn put(&self, key: &ContentKey, content: &[u8]) -> Result<()>;

    /// Read the content stored under the key
    async fn get(&self, key: &ContentKey) -> Result<Vec<u8>>;

    /// Remove the key's content; removing a missing key is not an error
    async fn delete(&self, key: &ContentKey) -> Result<()>;
}

/// Local filesystem storage backend - stores files under a base directory
pub struct LocalContentStore {
    base_path: PathBuf,
}

impl LocalContentStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn full_path(&self, key: &ContentKey) -> PathBuf {
        self.base_path.join(key.relative_path())
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn put(&self, key: &ContentKey, content: &[u8]) -> Result<()> {
        let full_path = self.full_path(key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;

        tracing::debug!(%key, bytes = content.len(), "Stored file content");
        Ok(())
    }

    async fn get(&self, key: &ContentKey) -> Result<Vec<u8>> {
        match fs::read(self.full_path(key)).await {
            Ok(content) => Ok(content),
            Err(e) if is_missing(&e) => Err(StorageError::NotFound { key: key.to_string() }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &ContentKey) -> Result<()> {
        match fs::remove_file(self.full_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Errors meaning "nothing can be stored at this path", as opposed to a failing disk.
fn is_missing(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_validate_filename() {
        for ok in ["a.txt", "report final.pdf", ".hidden", "ünïcödé.md", "a..b"] {
            assert!(validate_filename(ok).is_ok(), "{ok} should be accepted");
        }
        let too_long = "x".repeat(MAX_FILENAME_BYTES + 1);
        assert!(validate_filename(&"x".repeat(MAX_FILENAME_BYTES)).is_ok());
        for bad in ["", ".", "..", "../etc/passwd", "dir/a.txt", "dir\\a.txt", "a\0b", too_long.as_str()] {
            assert!(
                matches!(validate_filename(bad), Err(StorageError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_key_display_is_batch_scoped() {
        let batch_id = Uuid::new_v4();
        let key = ContentKey::new(batch_id, "a.txt").unwrap();

        assert_eq!(key.to_string(), format!("{batch_id}/a.txt"));
        assert_eq!(key.batch_id(), batch_id);
        assert_eq!(key.filename(), "a.txt");
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path().to_path_buf());
        let key = ContentKey::new(Uuid::new_v4(), "a.txt").unwrap();

        store.put(&key, b"hello").await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), b"hello");

        store.delete(&key).await.unwrap();
        assert!(matches!(store.get(&key).await, Err(StorageError::NotFound { .. })));
        // Deleting again is fine
        store.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path().to_path_buf());
        let key = ContentKey::new(Uuid::new_v4(), "missing.txt").unwrap();

        assert!(matches!(store.get(&key).await, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_path_through_a_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let batch_id = Uuid::new_v4();
        // A plain file where the batch directory should be
        std::fs::write(dir.path().join(batch_id.to_string()), b"not a directory").unwrap();
        let store = LocalContentStore::new(dir.path().to_path_buf());

        let key = ContentKey::new(batch_id, "a.txt").unwrap();
        assert!(matches!(store.get(&key).await, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_put_overwrites_within_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path().to_path_buf());
        let key = ContentKey::new(Uuid::new_v4(), "a.txt").unwrap();

        store.put(&key, b"first").await.unwrap();
        store.put(&key, b"second").await.unwrap();

        assert_eq!(store.get(&key).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_same_name_in_two_batches_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path().to_path_buf());
        let first = ContentKey::new(Uuid::new_v4(), "a.txt").unwrap();
        let second = ContentKey::new(Uuid::new_v4(), "a.txt").unwrap();

        store.put(&first, b"from first batch").await.unwrap();
        store.put(&second, b"from second batch").await.unwrap();

        assert_eq!(store.get(&first).await.unwrap(), b"from first batch");
        assert_eq!(store.get(&second).await.unwrap(), b"from second batch");
    }
}
