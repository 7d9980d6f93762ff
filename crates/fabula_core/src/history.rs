//! Conversation history replayed to the model for continuity.

use serde::{Deserialize, Serialize};

/// Participant in a generation exchange.
///
/// # Examples
///
/// ```
/// use fabula_core::Role;
///
/// assert_eq!(Role::Assistant.to_string(), "assistant");
/// assert_eq!("user".parse::<Role>().unwrap(), Role::User);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Standing instructions
    System,
    /// Prompt sent on behalf of the story
    User,
    /// Text returned by the model
    Assistant,
}

/// One turn of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the text
    pub role: Role,
    /// The text itself
    pub content: String,
}

impl Message {
    /// Create a message with an explicit role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}
