//! Top-level error wrapper types.

use crate::{
    ConfigError, DatabaseError, GenerationError, ImageServiceError, JsonError, StorageError,
    WorkerError,
};

/// Every error condition the workspace can raise.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaError, FabulaErrorKind, ConfigError};
///
/// let err: FabulaError = ConfigError::new("missing database.url").into();
/// assert!(matches!(err.kind(), FabulaErrorKind::Config(_)));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum FabulaErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Persistence failure or missing record
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Generative model call or output parsing failed
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Image service call or asset transfer failed
    #[from(ImageServiceError)]
    ImageService(ImageServiceError),
    /// Durable media storage failed
    #[from(StorageError)]
    Storage(StorageError),
    /// Worker lifecycle or translation wait failed
    #[from(WorkerError)]
    Worker(WorkerError),
}

/// Fabula error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Fabula Error: {}", _0)]
pub struct FabulaError(Box<FabulaErrorKind>);

impl FabulaError {
    /// Create a new error from a kind.
    pub fn new(kind: FabulaErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &FabulaErrorKind {
        &self.0
    }

    /// The database error, if this is one.
    pub fn as_database(&self) -> Option<&DatabaseError> {
        match self.kind() {
            FabulaErrorKind::Database(e) => Some(e),
            _ => None,
        }
    }

    /// True for a store write rejected for lack of privileges.
    pub fn is_permission_denied(&self) -> bool {
        self.as_database()
            .is_some_and(DatabaseError::is_permission_denied)
    }
}

impl<T> From<T> for FabulaError
where
    T: Into<FabulaErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Fabula operations.
pub type FabulaResult<T> = std::result::Result<T, FabulaError>;
