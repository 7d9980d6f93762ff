//! Extraction of chapter sections from model output.
//!
//! The model answers with headed sections:
//!
//! ```text
//! ### TITLE
//! The Salt Road
//! ### CHAPTER
//! The caravan left at dawn...
//! ### IMAGE PROMPT
//! A line of camels crossing white salt flats at sunrise
//! ### METADATA
//! {"characters": ["Amara"], "mood": "hopeful"}
//! ```
//!
//! `TITLE` and `CHAPTER` are required; `IMAGE PROMPT` and `METADATA` are
//! optional. Text before the first heading is ignored.

use fabula_core::ChapterDraft;
use fabula_error::{GenerationError, GenerationErrorKind};
use std::collections::HashMap;

/// A delimited section of model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Chapter title
    Title,
    /// Chapter body
    Chapter,
    /// Cover illustration prompt
    ImagePrompt,
    /// JSON metadata
    Metadata,
}

impl Section {
    /// Every section in output order.
    pub const ALL: [Section; 4] = [
        Section::Title,
        Section::Chapter,
        Section::ImagePrompt,
        Section::Metadata,
    ];

    /// The heading line introducing the section.
    pub fn heading(self) -> &'static str {
        match self {
            Section::Title => "### TITLE",
            Section::Chapter => "### CHAPTER",
            Section::ImagePrompt => "### IMAGE PROMPT",
            Section::Metadata => "### METADATA",
        }
    }

    fn name(self) -> &'static str {
        self.heading().trim_start_matches("### ")
    }

    fn from_line(line: &str) -> Option<Section> {
        let trimmed = line.trim();
        let label = trimmed.strip_prefix("###")?.trim().trim_end_matches(':');
        Section::ALL
            .into_iter()
            .find(|section| section.name().eq_ignore_ascii_case(label))
    }
}

/// Parse a model response into a [`ChapterDraft`].
///
/// # Errors
///
/// - [`GenerationErrorKind::EmptyResponse`] for blank output
/// - [`GenerationErrorKind::MissingSection`] when `TITLE` or `CHAPTER` is absent
/// - [`GenerationErrorKind::EmptySection`] when either is present but blank
/// - [`GenerationErrorKind::InvalidMetadata`] when `METADATA` is not a JSON object
///
/// # Examples
///
/// ```
/// use fabula_models::parse_chapter;
///
/// let draft = parse_chapter("### TITLE\nDawn\n### CHAPTER\nThe sun rose.").unwrap();
/// assert_eq!(draft.title, "Dawn");
/// assert!(draft.image_prompt.is_none());
///
/// assert!(parse_chapter("just some prose").is_err());
/// ```
pub fn parse_chapter(text: &str) -> Result<ChapterDraft, GenerationError> {
    if text.trim().is_empty() {
        return Err(GenerationError::new(GenerationErrorKind::EmptyResponse));
    }

    let sections = split_sections(text);

    let title = required(&sections, Section::Title)?;
    let body = required(&sections, Section::Chapter)?;
    let image_prompt = sections
        .get(&Section::ImagePrompt)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let metadata = match sections.get(&Section::Metadata) {
        Some(raw) => parse_metadata(raw)?,
        None => None,
    };

    Ok(ChapterDraft {
        title,
        body,
        image_prompt,
        metadata,
    })
}

fn split_sections(text: &str) -> HashMap<Section, String> {
    let mut sections: HashMap<Section, String> = HashMap::new();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        if let Some(section) = Section::from_line(line) {
            // First occurrence wins
            current = if sections.contains_key(&section) {
                None
            } else {
                sections.insert(section, String::new());
                Some(section)
            };
            continue;
        }

        if let Some(section) = current {
            if let Some(buffer) = sections.get_mut(&section) {
                buffer.push_str(line);
                buffer.push('\n');
            }
        }
    }

    sections
}

fn required(
    sections: &HashMap<Section, String>,
    section: Section,
) -> Result<String, GenerationError> {
    let content = sections.get(&section).ok_or_else(|| {
        GenerationError::new(GenerationErrorKind::MissingSection(section.name().to_string()))
    })?;

    let content = content.trim();
    if content.is_empty() {
        return Err(GenerationError::new(GenerationErrorKind::EmptySection(
            section.name().to_string(),
        )));
    }
    Ok(content.to_string())
}

fn parse_metadata(raw: &str) -> Result<Option<serde_json::Value>, GenerationError> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    if unfenced.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(unfenced)
        .map_err(|e| GenerationError::new(GenerationErrorKind::InvalidMetadata(e.to_string())))?;

    if !value.is_object() {
        return Err(GenerationError::new(GenerationErrorKind::InvalidMetadata(
            "expected a JSON object".to_string(),
        )));
    }
    Ok(Some(value))
}
