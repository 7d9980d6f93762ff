//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use fabula_core::ReaderRating;
use std::path::PathBuf;
use uuid::Uuid;

/// Fabula - story generation orchestration
#[derive(Parser, Debug)]
#[command(name = "fabula")]
#[command(about = "Chapter generation queue, cover image scheduler and translation cache", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file layered above the standard locations
    #[arg(short, long, global = true, env = "FABULA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the chapter queue, image scheduler and cache sweep until Ctrl+C
    Serve,

    /// Apply pending database migrations
    Migrate,

    /// Story management
    #[command(subcommand)]
    Story(StoryCommands),

    /// Generation job management
    #[command(subcommand)]
    Job(JobCommands),

    /// Translation cache maintenance
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Translate a chapter, from the cache when possible
    Translate {
        /// Story id
        story_id: Uuid,

        /// Chapter number
        chapter: i32,

        /// Target language tag
        #[arg(long)]
        to: String,

        /// Queue a background translation and wait for it instead of translating inline
        #[arg(long)]
        background: bool,
    },

    /// Conversation log diagnostics
    #[command(subcommand)]
    Logs(LogsCommands),
}

/// Story subcommands
#[derive(Subcommand, Debug)]
pub enum StoryCommands {
    /// Create a story
    Create {
        /// The reader's premise
        #[arg(long)]
        premise: String,

        /// Working title
        #[arg(long)]
        title: Option<String>,

        /// Genre hint
        #[arg(long)]
        genre: Option<String>,

        /// Story language
        #[arg(long, default_value = "en")]
        language: String,

        /// Also enqueue the first chapter
        #[arg(long)]
        enqueue: bool,
    },

    /// Show a story and its chapters
    Show {
        /// Story id
        story_id: Uuid,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },
}

/// Job subcommands
#[derive(Subcommand, Debug)]
pub enum JobCommands {
    /// Enqueue the first chapter of a story
    EnqueueCreation {
        /// Story id
        story_id: Uuid,
    },

    /// Enqueue a continuation driven by reader feedback
    EnqueueFeedback {
        /// Story id
        story_id: Uuid,

        /// Chapter to generate
        #[arg(long)]
        chapter: i32,

        /// Reader verdict on the previous chapter (loved, liked, disliked)
        #[arg(long)]
        rating: Option<ReaderRating>,

        /// Reason picked by the reader, repeatable
        #[arg(long = "reason")]
        reasons: Vec<String>,

        /// Free-form note
        #[arg(long)]
        comment: Option<String>,
    },

    /// Show one job
    Show {
        /// Job id
        job_id: Uuid,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// List the jobs of a story
    List {
        /// Story id
        story_id: Uuid,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Delete expired translations
    Cleanup,
}

/// Conversation log subcommands
#[derive(Subcommand, Debug)]
pub enum LogsCommands {
    /// Exchange counts, tokens and average latency
    Stats {
        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Every exchange of one story
    Story {
        /// Story id
        story_id: Uuid,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
