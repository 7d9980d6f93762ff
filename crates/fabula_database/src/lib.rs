//! PostgreSQL persistence for Fabula.
//!
//! One [`PostgresStore`] implements every store trait from
//! `fabula_interface` over an r2d2 connection pool:
//!
//! - generation jobs, claimed with `FOR UPDATE SKIP LOCKED` so concurrent
//!   workers never process the same job twice
//! - stories with their embedded image pipeline columns, and their chapters
//! - the translation cache, keyed by content type, content id and language pair
//! - the append-only conversation log
//!
//! # Example
//!
//! ```no_run
//! use fabula_database::{PostgresStore, establish_pool, checkout, run_migrations};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = establish_pool("postgres://localhost/fabula", 8)?;
//! let mut conn = checkout(&pool)?;
//! run_migrations(&mut conn)?;
//! let store = PostgresStore::new(pool);
//! # let _ = store;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod connection;
mod models;
mod store;

pub mod schema;

pub use connection::{DbConnection, DbPool, checkout, establish_pool, run_migrations};
pub use store::PostgresStore;

use fabula_error::DatabaseError;

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
