//! External image-generation service errors.

/// Image service failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ImageServiceErrorKind {
    /// Transport-level failure
    #[display("HTTP error: {}", _0)]
    Http(String),
    /// Non-success status from the service
    #[display("API error (status {}): {}", status, message)]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },
    /// Response body could not be decoded
    #[display("Failed to decode response: {}", _0)]
    Deserialization(String),
    /// Downloading a finished asset failed
    #[display("Asset transfer failed: {}", _0)]
    Transfer(String),
}

/// Image service error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Image Service Error: {} ({}:{})", kind, file, line)]
pub struct ImageServiceError {
    /// The specific error condition
    pub kind: ImageServiceErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ImageServiceError {
    /// Create a new ImageServiceError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ImageServiceErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
