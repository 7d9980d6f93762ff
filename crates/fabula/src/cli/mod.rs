//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the fabula binary.

mod commands;
mod content;
mod server;
mod story;

pub use commands::{Cli, Commands};
pub use content::{handle_cache_command, handle_logs_command, translate};
pub use server::{run_migrations, serve};
pub use story::{handle_job_command, handle_story_command};

use commands::OutputFormat;
use fabula::{FabulaResult, JsonError};
use serde::Serialize;

/// Print `value` as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> FabulaResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| JsonError::new(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn is_json(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json)
}
