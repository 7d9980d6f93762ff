//! Error types for the Fabula workspace.
//!
//! # Error Hierarchy
//!
//! Every concern follows the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum names the specific condition
//! - `*Error` struct wraps the kind with the source location that raised it
//! - Constructors use `#[track_caller]` so the location is captured automatically
//!
//! All concern errors convert into [`FabulaError`], so `?` works across crates.
//!
//! # Examples
//!
//! ```
//! use fabula_error::{FabulaResult, GenerationError, GenerationErrorKind};
//!
//! fn parse() -> FabulaResult<String> {
//!     Err(GenerationError::new(GenerationErrorKind::EmptyResponse))?
//! }
//!
//! assert!(parse().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod database;
mod error;
mod generation;
mod image_service;
mod json;
mod storage;
mod worker;

pub use config::ConfigError;
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{FabulaError, FabulaErrorKind, FabulaResult};
pub use generation::{GenerationError, GenerationErrorKind};
pub use image_service::{ImageServiceError, ImageServiceErrorKind};
pub use json::JsonError;
pub use storage::{StorageError, StorageErrorKind};
pub use worker::{WorkerError, WorkerErrorKind};
