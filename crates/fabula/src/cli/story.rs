//! Story and job command handlers.

use super::commands::{JobCommands, OutputFormat, StoryCommands};
use super::{is_json, print_json};
use fabula::{
    DatabaseError, Fabula, FabulaResult, FeedbackPayload, GenerationJob, NewStoryBuilder,
};
use uuid::Uuid;

/// Handle story commands.
pub async fn handle_story_command(app: &Fabula, cmd: StoryCommands) -> FabulaResult<()> {
    match cmd {
        StoryCommands::Create {
            premise,
            title,
            genre,
            language,
            enqueue,
        } => {
            let new_story = NewStoryBuilder::default()
                .premise(premise)
                .title(title)
                .genre(genre)
                .language(language)
                .build()
                .map_err(|e| fabula::ConfigError::new(e.to_string()))?;
            let story = app.stores().stories.create_story(new_story).await?;
            println!("Created story {}", story.id);

            if enqueue {
                let job = app.queue().enqueue_creation(story.id).await?;
                println!("Enqueued job {} for chapter {}", job.id, job.chapter_number);
            }
            Ok(())
        }

        StoryCommands::Show { story_id, format } => show_story(app, story_id, format).await,
    }
}

async fn show_story(app: &Fabula, story_id: Uuid, format: OutputFormat) -> FabulaResult<()> {
    let stories = &app.stores().stories;
    let story = stories
        .get_story(story_id)
        .await?
        .ok_or_else(|| DatabaseError::not_found(format!("story {}", story_id)))?;
    let chapters = stories.chapters(story_id).await?;

    if is_json(format) {
        return print_json(&serde_json::json!({ "story": story, "chapters": chapters }));
    }

    println!(
        "{} [{}]",
        story.title.as_deref().unwrap_or("(untitled)"),
        story.id
    );
    println!("Premise: {}", story.premise);
    println!("Language: {}  Chapters: {}", story.language, story.chapter_count);
    println!(
        "Cover: {} (retries {}){}",
        story.image.status,
        story.image.retry_count,
        story
            .image
            .image_url
            .as_deref()
            .map(|url| format!(" {}", url))
            .unwrap_or_default()
    );
    println!("{:-<80}", "");
    for chapter in &chapters {
        println!("{}. {}", chapter.chapter_number, chapter.title);
    }
    Ok(())
}

/// Handle job commands.
pub async fn handle_job_command(app: &Fabula, cmd: JobCommands) -> FabulaResult<()> {
    match cmd {
        JobCommands::EnqueueCreation { story_id } => {
            let job = app.queue().enqueue_creation(story_id).await?;
            print_job_line(&job);
            Ok(())
        }

        JobCommands::EnqueueFeedback {
            story_id,
            chapter,
            rating,
            reasons,
            comment,
        } => {
            let feedback = rating.map(|rating| {
                let payload = FeedbackPayload::new(rating).with_reasons(reasons);
                match comment {
                    Some(comment) => payload.with_comment(comment),
                    None => payload,
                }
            });
            let job = app
                .queue()
                .enqueue_feedback(story_id, chapter, feedback)
                .await?;
            print_job_line(&job);
            Ok(())
        }

        JobCommands::Show { job_id, format } => {
            let job = app
                .stores()
                .jobs
                .get_job(job_id)
                .await?
                .ok_or_else(|| DatabaseError::not_found(format!("job {}", job_id)))?;
            if is_json(format) {
                return print_json(&job);
            }
            print_job_line(&job);
            if let Some(error) = &job.error_message {
                println!("  last error: {}", error);
            }
            Ok(())
        }

        JobCommands::List { story_id, format } => {
            let jobs = app.stores().jobs.jobs_for_story(story_id).await?;
            if is_json(format) {
                return print_json(&jobs);
            }
            for job in &jobs {
                print_job_line(job);
            }
            println!("Total: {} jobs", jobs.len());
            Ok(())
        }
    }
}

fn print_job_line(job: &GenerationJob) {
    println!(
        "{}  chapter {}  {}  {}  attempts {}  created {}",
        job.id,
        job.chapter_number,
        job.trigger,
        job.status,
        job.attempts,
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}
