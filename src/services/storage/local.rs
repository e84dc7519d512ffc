//! Filesystem storage backend.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::config::StorageKind;

use super::{StorageBackend, StorageError, StoredObject, UploadPolicy, is_safe_key};

/// Stores images below a root directory.
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: Option<String>,
    policy: UploadPolicy,
}

impl LocalStorage {
    pub fn new(root: PathBuf, public_base_url: Option<String>, policy: UploadPolicy) -> Self {
        Self {
            root,
            public_base_url,
            policy,
        }
    }

    /// Resolve a key below the root, refusing anything that could escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(key);
        let is_plain = is_safe_key(key)
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(path))
    }

    fn public_url(&self, key: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), key))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    async fn store(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let path = self.resolve(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!("Stored {} ({} bytes)", path.display(), bytes.len());

        Ok(StoredObject {
            reference: key.to_string(),
            public_url: self.public_url(key),
            size: bytes.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(root: &Path, base: Option<&str>) -> LocalStorage {
        LocalStorage::new(
            root.to_path_buf(),
            base.map(str::to_string),
            UploadPolicy {
                max_file_size: 1024,
                allowed_types: vec!["image/jpeg".to_string()],
            },
        )
    }

    #[tokio::test]
    async fn test_store_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = storage(dir.path(), Some("http://localhost:8000/uploads/"));

        let stored = backend
            .store("images/abc/photo.jpg", b"jpeg-bytes", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(stored.reference, "images/abc/photo.jpg");
        assert_eq!(stored.size, 10);
        assert_eq!(
            stored.public_url.as_deref(),
            Some("http://localhost:8000/uploads/images/abc/photo.jpg")
        );

        let on_disk = std::fs::read(dir.path().join("images/abc/photo.jpg")).unwrap();
        assert_eq!(on_disk, b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_store_without_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let backend = storage(dir.path(), None);
        let stored = backend.store("a.jpg", b"x", "image/jpeg").await.unwrap();
        assert!(stored.public_url.is_none());
    }

    #[tokio::test]
    async fn test_store_accepts_dots_inside_names() {
        let dir = tempfile::tempdir().unwrap();
        let backend = storage(dir.path(), None);

        let stored = backend
            .store("images/abc/my..pic.jpg", b"x", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(stored.reference, "images/abc/my..pic.jpg");
        assert!(dir.path().join("images/abc/my..pic.jpg").exists());
    }

    #[tokio::test]
    async fn test_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = storage(dir.path(), None);

        for key in ["../outside.jpg", "/etc/passwd", "images/../../x.jpg", ""] {
            let err = backend.store(key, b"x", "image/jpeg").await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "{}", key);
        }
    }
}
