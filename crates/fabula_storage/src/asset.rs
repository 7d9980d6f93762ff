//! Stored asset descriptors.

/// Broad category of an asset, used as the top-level directory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum AssetKind {
    /// Story cover image
    Covers,
}

impl AssetKind {
    /// File extension for a MIME type, `bin` when unknown.
    pub fn extension_for(mime_type: &str) -> &'static str {
        match mime_type.split(';').next().map(str::trim) {
            Some("image/png") => "png",
            Some("image/jpeg") | Some("image/jpg") => "jpg",
            Some("image/webp") => "webp",
            Some("image/gif") => "gif",
            _ => "bin",
        }
    }
}

/// Where a stored asset lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredAsset {
    /// SHA-256 of the content, lowercase hex
    pub content_hash: String,
    /// Path relative to the backend root
    pub relative_path: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// MIME type
    pub mime_type: String,
}
