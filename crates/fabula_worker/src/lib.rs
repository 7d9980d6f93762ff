//! Background workers for Fabula.
//!
//! - [`ChapterQueue`] claims generation jobs one at a time and persists the
//!   chapters they produce.
//! - [`ImageScheduler`] drives cover images through the external image
//!   service, resubmitting stalled ones on a [`RetrySchedule`].
//! - [`TranslationService`] serves chapter translations through the
//!   translation cache and translates on a miss.
//! - [`ConversationLogger`] records every model exchange.
//! - [`WorkerServer`] owns the loops and their start/stop lifecycle.
//!
//! In-memory implementations of the store traits live in this crate as well,
//! for tests and for running without a database.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backoff;
mod busy;
mod config;
mod conversation;
mod feedback;
mod images;
mod memory;
mod queue;
mod server;
mod translation;

pub use backoff::RetrySchedule;
pub use config::{
    FailurePolicy, ImageConfig, ImageConfigBuilder, QueueConfig, QueueConfigBuilder,
    TranslationConfig, TranslationConfigBuilder,
};
pub use conversation::{ConversationLogger, Exchange, LogStats};
pub use feedback::feedback_instruction;
pub use images::{ImageScheduler, ImageTickReport};
pub use memory::{InMemoryConversationLog, InMemoryJobStore, InMemoryStoryStore};
pub use queue::{ChapterQueue, TickOutcome};
pub use server::WorkerServer;
pub use translation::{TranslationOutcome, TranslationService};
