//! Content-addressed filesystem backend.

use crate::{AssetKind, AssetStorage, StoredAsset};
use fabula_error::{FabulaResult, StorageError, StorageErrorKind};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Filesystem storage backend.
///
/// Assets are written to `{base_path}/{kind}/{hash[0:2]}/{hash[2:4]}/{hash}.{ext}`.
/// Identical bytes land on the same path, and writes go through a temporary
/// file that is renamed into place so readers never see a partial image.
///
/// Public URLs are `{public_base_url}/{relative_path}` when a base URL is
/// configured (a CDN or static file server in front of `base_path`), and
/// `file://` URLs otherwise.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    base_path: PathBuf,
    public_base_url: Option<String>,
}

impl FileSystemStorage {
    /// Open a storage root, creating it if needed.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> FabulaResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Opened filesystem storage");
        Ok(Self {
            base_path,
            public_base_url: None,
        })
    }

    /// Serve stored assets under `url` instead of `file://` paths.
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.public_base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Storage root.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    fn relative_path(kind: AssetKind, hash: &str, mime_type: &str) -> String {
        format!(
            "{}/{}/{}/{}.{}",
            kind,
            &hash[0..2],
            &hash[2..4],
            hash,
            AssetKind::extension_for(mime_type)
        )
    }

    fn full_path(&self, asset: &StoredAsset) -> FabulaResult<PathBuf> {
        // Stored paths come back from the database; refuse anything that
        // could escape the root.
        if asset.relative_path.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(StorageError::new(StorageErrorKind::InvalidPath(
                asset.relative_path.clone(),
            ))
            .into());
        }
        Ok(self.base_path.join(&asset.relative_path))
    }

    fn verify_hash(data: &[u8], expected_hash: &str) -> FabulaResult<()> {
        let actual_hash = Self::compute_hash(data);
        if actual_hash != expected_hash {
            return Err(StorageError::new(StorageErrorKind::DigestMismatch {
                expected: expected_hash.to_string(),
                actual: actual_hash,
            })
            .into());
        }
        Ok(())
    }

    fn map_io(path: &Path, err: std::io::Error, kind: fn(String) -> StorageErrorKind) -> StorageError {
        let message = format!("{}: {}", path.display(), err);
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::new(StorageErrorKind::NotFound(message)),
            std::io::ErrorKind::PermissionDenied => {
                StorageError::new(StorageErrorKind::PermissionDenied(message))
            }
            _ => StorageError::new(kind(message)),
        }
    }
}

#[async_trait::async_trait]
impl AssetStorage for FileSystemStorage {
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn store(&self, data: &[u8], mime_type: &str) -> FabulaResult<StoredAsset> {
        let hash = Self::compute_hash(data);
        let asset = StoredAsset {
            relative_path: Self::relative_path(AssetKind::Covers, &hash, mime_type),
            content_hash: hash,
            size_bytes: data.len() as u64,
            mime_type: mime_type.to_string(),
        };
        let path = self.full_path(&asset)?;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(hash = %asset.content_hash, "Asset already stored");
            return Ok(asset);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Self::map_io(parent, e, StorageErrorKind::DirectoryCreation)
            })?;
        }

        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, data)
            .await
            .map_err(|e| Self::map_io(&temp_path, e, StorageErrorKind::FileWrite))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| Self::map_io(&path, e, StorageErrorKind::FileWrite))?;

        tracing::info!(
            hash = %asset.content_hash,
            path = %asset.relative_path,
            "Stored asset"
        );
        Ok(asset)
    }

    #[tracing::instrument(skip(self), fields(hash = %asset.content_hash))]
    async fn retrieve(&self, asset: &StoredAsset) -> FabulaResult<Vec<u8>> {
        let path = self.full_path(asset)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| Self::map_io(&path, e, StorageErrorKind::FileRead))?;
        Self::verify_hash(&data, &asset.content_hash)?;
        Ok(data)
    }

    async fn exists(&self, asset: &StoredAsset) -> FabulaResult<bool> {
        let path = self.full_path(asset)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Self::map_io(&path, e, StorageErrorKind::FileRead).into())
    }

    fn public_url(&self, asset: &StoredAsset) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base, asset.relative_path),
            None => format!("file://{}", self.base_path.join(&asset.relative_path).display()),
        }
    }
}
