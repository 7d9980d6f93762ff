//! Cover asset storage failures.

/// What went wrong while storing or reading an asset.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum StorageErrorKind {
    /// The storage root or a shard directory could not be created
    #[display("Cannot create directory {}", _0)]
    DirectoryCreation(String),
    /// Writing asset bytes failed
    #[display("Cannot write asset {}", _0)]
    FileWrite(String),
    /// Reading asset bytes failed
    #[display("Cannot read asset {}", _0)]
    FileRead(String),
    /// No asset at that path
    #[display("Asset not found: {}", _0)]
    NotFound(String),
    /// A stored relative path points outside the root
    #[display("Unsafe asset path: {}", _0)]
    InvalidPath(String),
    /// Bytes on disk no longer match their content address
    #[display("Digest mismatch: expected {expected}, found {actual}")]
    DigestMismatch {
        /// Digest recorded at store time
        expected: String,
        /// Digest of the bytes read back
        actual: String,
    },
    /// The filesystem refused access
    #[display("Access denied: {}", _0)]
    PermissionDenied(String),
}

/// Asset storage error, stamped with where it was raised.
///
/// # Examples
///
/// ```
/// use fabula_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("covers/ab/cd".into()));
/// assert!(err.is_not_found());
/// assert!(err.to_string().starts_with("Storage Error: Asset not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} ({}:{})", kind, file, line)]
pub struct StorageError {
    /// Failure condition
    pub kind: StorageErrorKind,
    /// Raising line
    pub line: u32,
    /// Raising file
    pub file: &'static str,
}

impl StorageError {
    /// Wrap `kind` with the caller's location.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let caller = std::panic::Location::caller();
        Self {
            kind,
            line: caller.line(),
            file: caller.file(),
        }
    }

    /// Whether the asset simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StorageErrorKind::NotFound(_))
    }
}
