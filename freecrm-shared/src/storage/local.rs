/// Filesystem-backed object store
///
/// Keys map to paths under a root directory. Every key segment must be a
/// plain path component, so a key can never resolve outside the root.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{ObjectInfo, ObjectStore, StorageError, StoredObject};

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut relative = PathBuf::new();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                _ => return Err(StorageError::InvalidName(key.to_string())),
            }
        }
        if relative.as_os_str().is_empty() {
            return Err(StorageError::InvalidName(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

fn not_found_as(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |e| match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
        _ => StorageError::Io(e),
    }
}

/// Writes `data` to a freshly created file, removing the file if the write
/// fails so no partial object is left behind
async fn write_or_remove<W>(mut writer: W, path: &Path, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match writer.write_all(data).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    drop(writer);

    if let Err(e) = written {
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %remove_err, "Failed to remove partial object");
        }
        return Err(e);
    }

    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<StoredObject, StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(key.to_string()),
                _ => StorageError::Io(e),
            })?;

        write_or_remove(file, &path, &data).await?;

        let sha256 = hex::encode(Sha256::digest(&data));
        tracing::debug!(key, size = data.len(), "Stored object");

        Ok(StoredObject {
            key: key.to_string(),
            size: data.len() as u64,
            sha256,
        })
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.path_for(key)?;
        let data = tokio::fs::read(&path).await.map_err(not_found_as(key))?;

        Ok(Bytes::from(data))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let dir = self.path_for(prefix)?;
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut objects = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            objects.push(ObjectInfo {
                key: format!("{}/{}", prefix.trim_end_matches('/'), name),
                name,
                size: metadata.len(),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path).await.map_err(not_found_as(key))?;

        tracing::debug!(key, "Deleted object");
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let count = self.list(prefix).await?.len();
        let dir = self.path_for(prefix)?;

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::Io(e)),
        }

        tracing::debug!(prefix, count, "Deleted objects under prefix");
        Ok(count)
    }
}
