//! Durable storage for generated assets.
//!
//! Image services hand back short-lived URLs. Before a cover is attached to a
//! story its bytes are copied into an [`AssetStorage`] backend, which files
//! them by SHA-256 digest and exposes a stable URL.
//!
//! # Example
//!
//! ```rust
//! use fabula_storage::{AssetStorage, FileSystemStorage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = FileSystemStorage::new("/tmp/fabula-covers")?
//!     .with_public_base_url("https://cdn.example.com/media");
//!
//! let asset = storage.store(b"\x89PNG...", "image/png").await?;
//! let url = storage.public_url(&asset);
//! assert!(url.starts_with("https://cdn.example.com/media/covers/"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod asset;
mod filesystem;

pub use asset::{AssetKind, StoredAsset};
pub use fabula_error::{StorageError, StorageErrorKind};
pub use filesystem::FileSystemStorage;

use fabula_error::FabulaResult;

/// Pluggable durable storage backend.
#[async_trait::async_trait]
pub trait AssetStorage: Send + Sync {
    /// Store bytes and return where they landed.
    ///
    /// Identical content maps to the same location.
    async fn store(&self, data: &[u8], mime_type: &str) -> FabulaResult<StoredAsset>;

    /// Read a stored asset back, verifying its digest.
    async fn retrieve(&self, asset: &StoredAsset) -> FabulaResult<Vec<u8>>;

    /// Whether the asset is present.
    async fn exists(&self, asset: &StoredAsset) -> FabulaResult<bool>;

    /// A URL that stays valid for as long as the asset is stored.
    fn public_url(&self, asset: &StoredAsset) -> String;
}
