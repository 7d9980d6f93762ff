//! Persistence failures shared by the PostgreSQL and in-memory stores.

/// Why a store operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum DatabaseErrorKind {
    /// Could not reach PostgreSQL
    #[display("Cannot connect: {}", _0)]
    Connection(String),
    /// The r2d2 pool had no connection to hand out
    #[display("Pool exhausted or broken: {}", _0)]
    Pool(String),
    /// A statement failed, or a store rejected an illegal transition
    #[display("Query failed: {}", _0)]
    Query(String),
    /// A stored column did not convert to or from its domain type
    #[display("Column conversion failed: {}", _0)]
    Serialization(String),
    /// Embedded migrations could not be applied
    #[display("Migration failed: {}", _0)]
    Migration(String),
    /// The job, story or chapter does not exist
    #[display("Record not found: {}", _0)]
    NotFound(String),
    /// The role lacks write privileges, or the store is read-only
    #[display("Write denied: {}", _0)]
    PermissionDenied(String),
}

/// Store error, stamped with where it was raised.
///
/// # Examples
///
/// ```
/// use fabula_error::DatabaseError;
///
/// let err = DatabaseError::not_found("story 42");
/// assert!(err.to_string().contains("Record not found: story 42"));
/// assert!(!err.is_permission_denied());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Database Error: {} ({}:{})", kind, file, line)]
pub struct DatabaseError {
    /// Failure condition
    pub kind: DatabaseErrorKind,
    /// Raising line
    pub line: u32,
    /// Raising file
    pub file: &'static str,
}

impl DatabaseError {
    /// Wrap `kind` with the caller's location.
    #[track_caller]
    pub fn new(kind: DatabaseErrorKind) -> Self {
        let caller = std::panic::Location::caller();
        Self {
            kind,
            line: caller.line(),
            file: caller.file(),
        }
    }

    /// Shorthand for a [`DatabaseErrorKind::NotFound`] error.
    #[track_caller]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(DatabaseErrorKind::NotFound(what.into()))
    }

    /// Whether the store rejected the operation for lack of privileges.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::PermissionDenied(_))
    }
}

#[cfg(feature = "database")]
impl From<diesel::result::Error> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind as DieselKind, Error};

        match err {
            Error::NotFound => DatabaseError::not_found("row"),
            Error::DatabaseError(DieselKind::ReadOnlyTransaction, info) => {
                DatabaseError::new(DatabaseErrorKind::PermissionDenied(info.message().to_string()))
            }
            Error::DatabaseError(_, ref info)
                if info.message().to_lowercase().contains("permission denied") =>
            {
                DatabaseError::new(DatabaseErrorKind::PermissionDenied(info.message().to_string()))
            }
            Error::DeserializationError(e) => {
                DatabaseError::new(DatabaseErrorKind::Serialization(e.to_string()))
            }
            Error::SerializationError(e) => {
                DatabaseError::new(DatabaseErrorKind::Serialization(e.to_string()))
            }
            other => DatabaseError::new(DatabaseErrorKind::Query(other.to_string())),
        }
    }
}

#[cfg(feature = "database")]
impl From<diesel::ConnectionError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Connection(err.to_string()))
    }
}

#[cfg(feature = "database")]
impl From<serde_json::Error> for DatabaseError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::new(DatabaseErrorKind::Serialization(err.to_string()))
    }
}
