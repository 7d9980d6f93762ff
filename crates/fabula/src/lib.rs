//! Fabula - story generation orchestration
//!
//! Fabula turns a reader's premise into a serialized story. A durable queue
//! sequences chapter generation through a generative model, a scheduler
//! drives each story's cover image through an external image service, and a
//! content-addressed cache keeps chapter translations from being generated
//! twice.
//!
//! # Features
//!
//! - **Chapter queue**: FIFO jobs with an atomic claim, configurable retry
//!   policy and idempotent enqueue
//! - **Cover images**: forward-only pipeline state, backoff-driven
//!   resubmission and durable copies of finished assets
//! - **Translation cache**: digest-checked hits, best-effort writes and a
//!   scheduled expiry sweep
//! - **Conversation log**: every model exchange with tokens and latency
//!
//! # Cargo Features
//!
//! - `database` (default) - PostgreSQL stores via Diesel
//! - `observability` - OpenTelemetry stdout span exporter
//!
//! # Architecture
//!
//! - `fabula_error` - Error types
//! - `fabula_core` - Domain types and state transitions
//! - `fabula_interface` - Store and client traits
//! - `fabula_storage` - Content-addressed media storage
//! - `fabula_database` - PostgreSQL integration
//! - `fabula_models` - Model and image service clients
//! - `fabula_cache` - Translation cache
//! - `fabula_worker` - Queue, scheduler, translation service and server
//!
//! This crate re-exports everything for convenience and adds configuration
//! loading, store selection and the `fabula` binary.

mod app;
mod config;
mod observability;
mod stores;

pub use app::{Clients, Fabula};
pub use config::{DatabaseConfig, FabulaConfig, StorageConfig};
pub use observability::{ObservabilityConfig, init_observability};
pub use stores::Stores;

// Re-export workspace crates
pub use fabula_cache::*;
pub use fabula_core::*;
pub use fabula_error::*;
pub use fabula_interface::*;
pub use fabula_models::*;
pub use fabula_storage::*;
pub use fabula_worker::*;

#[cfg(feature = "database")]
pub use fabula_database::*;
