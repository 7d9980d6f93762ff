//! Conversation logger: audit trail of model exchanges.

use fabula_core::{ConversationLog, ExchangeType, NewConversationLog};
use fabula_error::FabulaResult;
use fabula_interface::ConversationLogStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// One exchange to record.
#[derive(Debug, Clone)]
pub struct Exchange<'a> {
    /// Story the exchange belongs to
    pub story_id: Uuid,
    /// Chapter produced or translated
    pub chapter_number: i32,
    /// Kind of exchange
    pub exchange_type: ExchangeType,
    /// Prompt sent
    pub input: &'a str,
    /// Raw text received
    pub output: &'a str,
    /// Model identifier
    pub model: &'a str,
    /// Tokens billed
    pub token_count: Option<u32>,
    /// Call duration
    pub latency: Duration,
}

/// Aggregates over the conversation log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogStats {
    /// Number of exchanges
    pub total: usize,
    /// Exchanges per kind
    pub by_type: BTreeMap<ExchangeType, usize>,
    /// Exchanges per model
    pub by_model: BTreeMap<String, usize>,
    /// Sum of reported tokens
    pub total_tokens: i64,
    /// Mean call duration, `None` when the log is empty
    pub average_latency_ms: Option<f64>,
}

impl LogStats {
    /// Compute aggregates over `logs`.
    pub fn from_logs(logs: &[ConversationLog]) -> Self {
        let mut stats = LogStats {
            total: logs.len(),
            ..Default::default()
        };
        let mut latency_sum: i64 = 0;

        for log in logs {
            *stats.by_type.entry(log.exchange_type).or_default() += 1;
            *stats.by_model.entry(log.model.clone()).or_default() += 1;
            stats.total_tokens += i64::from(log.token_count.unwrap_or(0));
            latency_sum += log.latency_ms;
        }

        if !logs.is_empty() {
            stats.average_latency_ms = Some(latency_sum as f64 / logs.len() as f64);
        }
        stats
    }
}

/// Append-only writer and diagnostic reader of the conversation log.
///
/// Recording is best-effort: a failed append is logged and never interrupts
/// the generation that produced it.
#[derive(Clone)]
pub struct ConversationLogger {
    store: Arc<dyn ConversationLogStore>,
}

impl std::fmt::Debug for ConversationLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationLogger").finish_non_exhaustive()
    }
}

impl ConversationLogger {
    /// Create a logger over `store`.
    pub fn new(store: Arc<dyn ConversationLogStore>) -> Self {
        Self { store }
    }

    /// Append one exchange.
    pub async fn record(&self, exchange: Exchange<'_>) -> Option<ConversationLog> {
        let entry = NewConversationLog {
            story_id: exchange.story_id,
            chapter_number: exchange.chapter_number,
            exchange_type: exchange.exchange_type,
            input: exchange.input.to_string(),
            output: exchange.output.to_string(),
            model: exchange.model.to_string(),
            token_count: exchange.token_count.and_then(|t| i32::try_from(t).ok()),
            latency_ms: i64::try_from(exchange.latency.as_millis()).unwrap_or(i64::MAX),
        };

        match self.store.append(entry).await {
            Ok(log) => {
                debug!(log_id = log.id, exchange_type = %log.exchange_type, "Recorded exchange");
                Some(log)
            }
            Err(e) => {
                warn!(error = %e, story_id = %exchange.story_id, "Failed to record exchange");
                None
            }
        }
    }

    /// Exchanges of one story, oldest first.
    pub async fn for_story(&self, story_id: Uuid) -> FabulaResult<Vec<ConversationLog>> {
        self.store.for_story(story_id).await
    }

    /// Aggregates over every recorded exchange.
    pub async fn stats(&self) -> FabulaResult<LogStats> {
        let logs = self.store.all().await?;
        Ok(LogStats::from_logs(&logs))
    }
}
