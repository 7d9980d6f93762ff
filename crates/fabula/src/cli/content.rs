//! Translation, cache and conversation log handlers.

use super::commands::{CacheCommands, LogsCommands};
use super::{is_json, print_json};
use fabula::{Fabula, FabulaResult, TranslationStatus};
use uuid::Uuid;

/// Handle cache commands.
pub async fn handle_cache_command(app: &Fabula, cmd: CacheCommands) -> FabulaResult<()> {
    match cmd {
        CacheCommands::Cleanup => {
            let removed = app.cache().cleanup_expired().await?;
            println!("Removed {} expired translations", removed);
            Ok(())
        }
    }
}

/// Translate one chapter and print the result.
///
/// With `background` the translation runs on the service's background path
/// and this waits for it the way a polling client would.
pub async fn translate(
    app: &Fabula,
    story_id: Uuid,
    chapter: i32,
    to: &str,
    background: bool,
) -> FabulaResult<()> {
    let translations = app.translations();

    if background {
        let status = translations
            .request_translation(story_id, chapter, to)
            .await?;
        if status != TranslationStatus::Completed {
            eprintln!("Translation queued, waiting...");
        }
        let content = translations
            .wait_for_translation(story_id, chapter, to)
            .await?;
        println!("{}", content);
        return Ok(());
    }

    let outcome = translations.translate_now(story_id, chapter, to).await?;
    if outcome.from_cache {
        eprintln!("(served from cache)");
    }
    println!("{}", outcome.content);
    Ok(())
}

/// Handle conversation log commands.
pub async fn handle_logs_command(app: &Fabula, cmd: LogsCommands) -> FabulaResult<()> {
    match cmd {
        LogsCommands::Stats { format } => {
            let stats = app.logger().stats().await?;
            if is_json(format) {
                return print_json(&stats);
            }

            println!("Exchanges: {}", stats.total);
            for (kind, count) in &stats.by_type {
                println!("  {:<14} {}", kind.to_string(), count);
            }
            println!("Models:");
            for (model, count) in &stats.by_model {
                println!("  {:<14} {}", model, count);
            }
            println!("Tokens: {}", stats.total_tokens);
            match stats.average_latency_ms {
                Some(avg) => println!("Average latency: {:.1} ms", avg),
                None => println!("Average latency: n/a"),
            }
            Ok(())
        }

        LogsCommands::Story { story_id, format } => {
            let logs = app.logger().for_story(story_id).await?;
            if is_json(format) {
                return print_json(&logs);
            }

            for log in &logs {
                println!(
                    "#{} chapter {} {} via {} ({} ms, {} tokens)",
                    log.id,
                    log.chapter_number,
                    log.exchange_type,
                    log.model,
                    log.latency_ms,
                    log.token_count
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "?".to_string())
                );
            }
            println!("Total: {} exchanges", logs.len());
            Ok(())
        }
    }
}
