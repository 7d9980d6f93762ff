//! Worker lifecycle and translation service errors.

/// Worker failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum WorkerErrorKind {
    /// `start` was called on a running server
    #[display("Worker server is already running")]
    AlreadyRunning,
    /// `stop` was called on a server that never started
    #[display("Worker server is not running")]
    NotRunning,
    /// A background loop panicked or was cancelled
    #[display("Background task failed: {}", _0)]
    Join(String),
    /// Bounded wait for a translation ran out
    #[display("Translation not ready after {} polls", attempts)]
    TranslationTimeout {
        /// Number of polls performed
        attempts: u32,
    },
    /// The background translation failed
    #[display("Translation failed: {}", _0)]
    TranslationFailed(String),
    /// The content to translate does not exist
    #[display("Content not found: {}", _0)]
    ContentNotFound(String),
}

/// Worker error with location tracking.
///
/// # Examples
///
/// ```
/// use fabula_error::{WorkerError, WorkerErrorKind};
///
/// let err = WorkerError::new(WorkerErrorKind::TranslationTimeout { attempts: 30 });
/// assert!(format!("{}", err).contains("30 polls"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Worker Error: {} ({}:{})", kind, file, line)]
pub struct WorkerError {
    /// The specific error condition
    pub kind: WorkerErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl WorkerError {
    /// Create a new WorkerError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: WorkerErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
