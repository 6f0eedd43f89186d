//! Blob storage
//!
//! Attachment bytes live in a storage backend under keys rendered from the
//! configured path template. Metadata rows only reference those keys.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// What a backend reports after writing a blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    pub size: u64,
    /// SHA256 digest, hex encoded
    pub digest: String,
}

/// Storage trait - unified interface for storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store data with a key, replacing any previous blob
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<StoredBlob>;

    /// Retrieve data by key
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Delete data by key; missing keys are not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get storage name for logging
    fn name(&self) -> &str;
}

pub(crate) fn digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Local filesystem storage
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve a key to a full path
    fn resolve_path(&self, key: &str) -> StorageResult<PathBuf> {
        // Prevent directory traversal
        let escapes = Path::new(key)
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if key.is_empty() || escapes || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidPath(key.to_string()));
        }

        Ok(self.root.join(key))
    }

    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    #[instrument(skip(self, data), fields(storage = "local", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<StoredBlob> {
        let path = self.resolve_path(key)?;
        self.ensure_parent(&path).await?;

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        debug!(path = ?path, "File stored");

        Ok(StoredBlob {
            key: key.to_string(),
            size: data.len() as u64,
            digest: digest(&data),
        })
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.resolve_path(key)?;

        let mut file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).await?;

        Ok(Bytes::from(buffer))
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = ?path, "File deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// In-memory storage for testing
pub struct MemoryStorage {
    files: tokio::sync::RwLock<std::collections::HashMap<String, Bytes>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            files: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }

    pub async fn keys(&self) -> Vec<String> {
        let files = self.files.read().await;
        let mut keys: Vec<String> = files.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<StoredBlob> {
        let blob = StoredBlob {
            key: key.to_string(),
            size: data.len() as u64,
            digest: digest(&data),
        };

        let mut files = self.files.write().await;
        files.insert(key.to_string(), data);

        Ok(blob)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let files = self.files.read().await;
        files
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut files = self.files.write().await;
        files.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let files = self.files.read().await;
        Ok(files.contains_key(key))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        let data = Bytes::from("sku,qty\nA-1,2\n");

        let blob = storage.put("attachments/1/invoice.csv", data.clone()).await.unwrap();
        assert_eq!(blob.size, 14);
        assert_eq!(blob.digest.len(), 64);

        assert!(storage.exists("attachments/1/invoice.csv").await.unwrap());
        let retrieved = storage.get("attachments/1/invoice.csv").await.unwrap();
        assert_eq!(retrieved, data);

        storage.delete("attachments/1/invoice.csv").await.unwrap();
        assert!(!storage.exists("attachments/1/invoice.csv").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_storage_missing_key() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.get("nope").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let data = Bytes::from_static(b"%PDF-1.7\n");

        let blob = storage.put("attachments/3/2/scan.pdf", data.clone()).await.unwrap();
        assert_eq!(blob.key, "attachments/3/2/scan.pdf");
        assert!(dir.path().join("attachments/3/2/scan.pdf").exists());

        assert!(storage.exists("attachments/3/2/scan.pdf").await.unwrap());
        assert_eq!(storage.get("attachments/3/2/scan.pdf").await.unwrap(), data);

        storage.delete("attachments/3/2/scan.pdf").await.unwrap();
        assert!(!storage.exists("attachments/3/2/scan.pdf").await.unwrap());
        // deleting twice is fine
        storage.delete("attachments/3/2/scan.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_local_storage_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        assert!(matches!(
            storage.get("attachments/9/gone.csv").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_storage_accepts_dots_inside_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage
            .put("attachments/1/report..final.csv", Bytes::from_static(b"a"))
            .await
            .unwrap();
        assert!(storage.exists("attachments/1/report..final.csv").await.unwrap());
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        for key in ["../etc/passwd", "attachments/../../x", "/etc/passwd", "\\windows", ""] {
            assert!(
                matches!(
                    storage.put(key, Bytes::from_static(b"x")).await,
                    Err(StorageError::InvalidPath(_))
                ),
                "key: {:?}",
                key
            );
        }
    }
}
