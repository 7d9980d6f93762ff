//! JSON encoding failures for CLI output and stored payloads.

/// A value could not be encoded to, or decoded from, JSON.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("JSON Error: {} ({}:{})", message, file, line)]
pub struct JsonError {
    /// Encoder or decoder message
    pub message: String,
    /// Raising line
    pub line: u32,
    /// Raising file
    pub file: &'static str,
}

impl JsonError {
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
