//! Prompt assembly.

use crate::parser::Section;
use fabula_core::StoryContext;
use fabula_interface::ChapterRequest;

/// Standing instructions for chapter generation, including the output format
/// that [`parse_chapter`](crate::parse_chapter) expects.
pub fn system_prompt(story: &StoryContext) -> String {
    let mut prompt = String::from(
        "You are a novelist writing an interactive serialized story one chapter at a time. \
         Readers rate each chapter and their feedback steers the next one.\n\n",
    );

    prompt.push_str(&format!("Write in the language with tag '{}'.\n", story.language));
    if let Some(genre) = &story.genre {
        prompt.push_str(&format!("Genre: {}.\n", genre));
    }
    if let Some(title) = &story.title {
        prompt.push_str(&format!("Story title: {}.\n", title));
    }

    prompt.push_str(&format!(
        "\nAnswer using exactly these sections, each introduced by its heading on its own line:\n\
         {title}\n<chapter title>\n\
         {chapter}\n<chapter text>\n\
         {image}\n<one-paragraph visual description for a cover illustration, first chapter only>\n\
         {metadata}\n<a JSON object with keys such as characters, setting, mood>\n\n\
         Do not add any text outside these sections.",
        title = Section::Title.heading(),
        chapter = Section::Chapter.heading(),
        image = Section::ImagePrompt.heading(),
        metadata = Section::Metadata.heading(),
    ));
    prompt
}

/// The user turn for one chapter request.
///
/// # Examples
///
/// ```
/// use fabula_core::StoryContext;
/// use fabula_interface::ChapterRequest;
/// use fabula_models::chapter_prompt;
/// # use uuid::Uuid;
///
/// let request = ChapterRequest {
///     story: StoryContext {
///         story_id: Uuid::nil(),
///         title: None,
///         premise: "A baker whose bread grants memories".into(),
///         genre: None,
///         language: "en".into(),
///     },
///     chapter_number: 1,
///     history: vec![],
///     feedback: None,
/// };
/// assert!(chapter_prompt(&request).contains("A baker whose bread grants memories"));
/// ```
pub fn chapter_prompt(request: &ChapterRequest) -> String {
    if request.is_opening() {
        return format!(
            "Write chapter {} of a new story based on this premise:\n\n{}",
            request.chapter_number, request.story.premise
        );
    }

    let mut prompt = format!("Write chapter {} of the story.", request.chapter_number);
    match &request.feedback {
        Some(feedback) => {
            prompt.push_str("\n\n");
            prompt.push_str(feedback);
        }
        None => prompt.push_str(" Continue naturally from where the last chapter ended."),
    }
    prompt
}

/// Standing instructions for translation.
pub fn translator_system_prompt(source_lang: &str, target_lang: &str) -> String {
    format!(
        "You are a literary translator. Translate the user's text from '{}' into '{}'. \
         Preserve paragraph breaks, tone and names. Reply with the translation only.",
        source_lang, target_lang
    )
}

/// The user turn for a translation.
pub fn translation_prompt(text: &str) -> String {
    text.to_string()
}
