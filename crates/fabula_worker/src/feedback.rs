//! Turning reader feedback into a steering instruction for the model.

use fabula_core::{FeedbackPayload, ReaderRating};

const CONTINUE_NATURALLY: &str = "Continue the story naturally from where the previous chapter \
ended, keeping the characters, voice and pacing consistent.";

/// Instruction appended to a continuation request.
///
/// Without feedback the model is simply asked to continue.
///
/// # Examples
///
/// ```
/// use fabula_core::{FeedbackPayload, ReaderRating};
/// use fabula_worker::feedback_instruction;
///
/// let feedback = FeedbackPayload::new(ReaderRating::Disliked)
///     .with_reasons(vec!["too slow".into()]);
/// let text = feedback_instruction(Some(&feedback));
/// assert!(text.contains("disliked"));
/// assert!(text.contains("too slow"));
/// ```
pub fn feedback_instruction(feedback: Option<&FeedbackPayload>) -> String {
    let Some(feedback) = feedback else {
        return CONTINUE_NATURALLY.to_string();
    };

    let mut text = format!(
        "The reader {} the previous chapter.",
        match feedback.rating {
            ReaderRating::Loved => "loved",
            ReaderRating::Liked => "liked",
            ReaderRating::Disliked => "disliked",
        }
    );

    let reasons: Vec<&str> = feedback
        .reasons
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    if !reasons.is_empty() {
        text.push_str(&format!(" Reasons: {}.", reasons.join(", ")));
    }

    if let Some(comment) = feedback.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        text.push_str(&format!(" Their note: \"{}\".", comment));
    }

    text.push(' ');
    text.push_str(match feedback.rating {
        ReaderRating::Loved | ReaderRating::Liked => {
            "Keep what worked and write the next chapter."
        }
        ReaderRating::Disliked => {
            "Address these concerns and change course in the next chapter while staying \
             consistent with established events."
        }
    });
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_feedback_is_generic() {
        assert_eq!(feedback_instruction(None), CONTINUE_NATURALLY);
    }

    #[test]
    fn loved_with_reasons_and_comment() {
        let feedback = FeedbackPayload::new(ReaderRating::Loved)
            .with_reasons(vec!["dialogue".into(), " ".into(), "twist".into()])
            .with_comment("More of the fox, please");
        let text = feedback_instruction(Some(&feedback));
        assert!(text.starts_with("The reader loved the previous chapter."));
        assert!(text.contains("Reasons: dialogue, twist."));
        assert!(text.contains("More of the fox, please"));
        assert!(text.ends_with("Keep what worked and write the next chapter."));
    }

    #[test]
    fn bare_rating_has_no_reason_clause() {
        let text = feedback_instruction(Some(&FeedbackPayload::new(ReaderRating::Liked)));
        assert!(!text.contains("Reasons"));
        assert!(text.contains("liked"));
    }
}
