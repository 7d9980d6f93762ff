//! Errors raised while calling the generative model or parsing its output.

/// Specific generation failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// Transport-level failure reaching the model endpoint
    #[display("HTTP error: {}", _0)]
    Http(String),
    /// The endpoint answered with a non-success status
    #[display("API error (status {}): {}", status, message)]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },
    /// The response body could not be decoded
    #[display("Failed to decode response: {}", _0)]
    Deserialization(String),
    /// The model returned no text at all
    #[display("Model returned an empty response")]
    EmptyResponse,
    /// A required delimited section is absent from the output
    #[display("Missing required section '{}' in model output", _0)]
    MissingSection(String),
    /// A required delimited section is present but blank
    #[display("Section '{}' in model output is empty", _0)]
    EmptySection(String),
    /// The metadata section is not a JSON object
    #[display("Invalid metadata section: {}", _0)]
    InvalidMetadata(String),
}

/// Generation error with location tracking.
///
/// # Examples
///
/// ```
/// use fabula_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::MissingSection("TITLE".into()));
/// assert!(err.is_parse_error());
/// assert!(format!("{}", err).contains("TITLE"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} ({}:{})", kind, file, line)]
pub struct GenerationError {
    /// The specific error condition
    pub kind: GenerationErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// True when the call succeeded but the output was malformed.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self.kind,
            GenerationErrorKind::EmptyResponse
                | GenerationErrorKind::MissingSection(_)
                | GenerationErrorKind::EmptySection(_)
                | GenerationErrorKind::InvalidMetadata(_)
        )
    }
}
