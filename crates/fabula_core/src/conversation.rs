//! Audit records of generation exchanges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of exchange with the model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExchangeType {
    /// First chapter of a story
    Creation,
    /// Later chapter, with history and feedback
    Continuation,
    /// Chapter translation
    Translation,
}

/// One logged exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationLog {
    /// Row id
    pub id: i64,
    /// Story the exchange belongs to
    pub story_id: Uuid,
    /// Chapter the exchange produced or translated
    pub chapter_number: i32,
    /// Kind of exchange
    pub exchange_type: ExchangeType,
    /// Prompt sent
    pub input: String,
    /// Raw text received
    pub output: String,
    /// Model identifier
    pub model: String,
    /// Tokens billed, when reported
    pub token_count: Option<i32>,
    /// Wall-clock duration of the call
    pub latency_ms: i64,
    /// Write time
    pub created_at: DateTime<Utc>,
}

/// Fields appended to the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConversationLog {
    /// Story the exchange belongs to
    pub story_id: Uuid,
    /// Chapter number
    pub chapter_number: i32,
    /// Kind of exchange
    pub exchange_type: ExchangeType,
    /// Prompt sent
    pub input: String,
    /// Raw text received
    pub output: String,
    /// Model identifier
    pub model: String,
    /// Tokens billed
    pub token_count: Option<i32>,
    /// Call duration
    pub latency_ms: i64,
}
