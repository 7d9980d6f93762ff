//! Fabula CLI binary.
//!
//! This binary provides command-line access to the orchestration layer:
//! - Run the chapter queue, image scheduler and cache sweep
//! - Create stories and enqueue chapters
//! - Translate chapters and maintain the translation cache
//! - Inspect the conversation log

use clap::Parser;
use fabula::{Fabula, FabulaConfig, ObservabilityConfig, init_observability};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{
        Cli, Commands, handle_cache_command, handle_job_command, handle_logs_command,
        handle_story_command, run_migrations, serve, translate,
    };

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut observability = ObservabilityConfig::default().with_json_logs(cli.json_logs);
    if cli.verbose {
        observability = observability.with_log_level("debug");
    }
    init_observability(observability)?;

    let config = FabulaConfig::load_with(cli.config.as_deref())?;

    if let Commands::Migrate = cli.command {
        run_migrations(&config)?;
        return Ok(());
    }

    let app = Fabula::from_config(config)?;

    match cli.command {
        Commands::Serve => serve(&app).await?,
        Commands::Migrate => {}
        Commands::Story(cmd) => handle_story_command(&app, cmd).await?,
        Commands::Job(cmd) => handle_job_command(&app, cmd).await?,
        Commands::Cache(cmd) => handle_cache_command(&app, cmd).await?,
        Commands::Translate {
            story_id,
            chapter,
            to,
            background,
        } => translate(&app, story_id, chapter, &to, background).await?,
        Commands::Logs(cmd) => handle_logs_command(&app, cmd).await?,
    }

    Ok(())
}
