//! Configuration failures.

/// Layered configuration could not be built, parsed or resolved.
///
/// # Examples
///
/// ```
/// use fabula_error::ConfigError;
///
/// let err = ConfigError::new("queue.max_attempts must be positive");
/// assert!(err.to_string().contains("queue.max_attempts"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} ({}:{})", message, file, line)]
pub struct ConfigError {
    /// What is wrong, naming the offending key where known
    pub message: String,
    /// Raising line
    pub line: u32,
    /// Raising file
    pub file: &'static str,
}

impl ConfigError {
    /// Wrap `message` with the caller's location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let caller = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: caller.line(),
            file: caller.file(),
        }
    }
}
