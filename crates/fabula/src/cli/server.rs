//! Worker server and migration handlers.

use fabula::{Fabula, FabulaConfig, FabulaResult};
use tracing::{info, warn};

/// Handle the `serve` command.
pub async fn serve(app: &Fabula) -> FabulaResult<()> {
    let mut server = app.server();
    server.start().await?;

    info!("Fabula worker running. Press Ctrl+C to stop.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C, shutting down");
    }

    info!("Shutting down, waiting for in-flight work");
    server.stop().await
}

/// Handle the `migrate` command.
#[cfg(feature = "database")]
pub fn run_migrations(config: &FabulaConfig) -> FabulaResult<()> {
    use fabula::{ConfigError, checkout, establish_pool};

    let url = config
        .database()
        .resolved_url()
        .ok_or_else(|| ConfigError::new("Set database.url or DATABASE_URL to run migrations"))?;
    let pool = establish_pool(&url, 1)?;
    let mut conn = checkout(&pool)?;
    let applied = fabula::run_migrations(&mut conn)?;
    println!("Applied {} migration(s)", applied);
    Ok(())
}

#[cfg(not(feature = "database"))]
pub fn run_migrations(_config: &FabulaConfig) -> FabulaResult<()> {
    eprintln!("Error: Database feature not enabled. Rebuild with --features database");
    std::process::exit(1);
}
