//! Wire types for the chat completions API and the image service.

use serde::{Deserialize, Serialize};

/// Role/content pair in a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`
    pub role: String,
    /// Message text
    pub content: String,
}

impl From<&fabula_core::Message> for ChatMessage {
    fn from(message: &fabula_core::Message) -> Self {
        Self {
            role: message.role.to_string(),
            content: message.content.clone(),
        }
    }
}

/// Chat completions request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Conversation so far
    pub messages: Vec<ChatMessage>,
    /// Completion token limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Chat completions response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Candidate completions
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Billing information
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

/// One candidate completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Generated message
    pub message: ChatMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUsage {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Completion tokens
    #[serde(default)]
    pub completion_tokens: u32,
    /// Sum of both
    #[serde(default)]
    pub total_tokens: u32,
}

/// Image submission body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSubmitRequest {
    /// Text prompt
    pub prompt: String,
    /// Requested models, service default when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
}

/// Image submission answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSubmitResponse {
    /// Opaque job id
    pub id: String,
}

/// Image job status answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStatusResponse {
    /// Finished, successfully or not
    #[serde(default)]
    pub done: bool,
    /// Service-side fault
    #[serde(default)]
    pub faulted: bool,
    /// Position while waiting
    #[serde(default)]
    pub queue_position: Option<u32>,
    /// Finished generations
    #[serde(default)]
    pub generations: Vec<ImageGeneration>,
}

/// One finished image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGeneration {
    /// Transient URL of the asset
    pub img: String,
    /// The service flagged this output as unusable
    #[serde(default)]
    pub censored: bool,
}

impl From<ImageStatusResponse> for fabula_core::ImageJobStatus {
    fn from(response: ImageStatusResponse) -> Self {
        let image_url = response
            .generations
            .into_iter()
            .find(|generation| !generation.censored && !generation.img.is_empty())
            .map(|generation| generation.img);
        Self {
            done: response.done,
            faulted: response.faulted,
            queue_position: response.queue_position,
            image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::ImageJobStatus;

    #[test]
    fn chat_response_decodes_usage() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content, "hi");
        assert_eq!(response.usage.unwrap().total_tokens, 12);
    }

    #[test]
    fn status_skips_censored_generations() {
        let body = r#"{
            "done": true,
            "faulted": false,
            "generations": [
                {"img": "https://tmp/a.webp", "censored": true},
                {"img": "https://tmp/b.webp"}
            ]
        }"#;
        let status: ImageJobStatus = serde_json::from_str::<ImageStatusResponse>(body)
            .unwrap()
            .into();
        assert!(status.done);
        assert_eq!(status.image_url.as_deref(), Some("https://tmp/b.webp"));
    }

    #[test]
    fn status_while_queued() {
        let body = r#"{"done": false, "faulted": false, "queue_position": 4}"#;
        let status: ImageJobStatus = serde_json::from_str::<ImageStatusResponse>(body)
            .unwrap()
            .into();
        assert!(!status.done);
        assert_eq!(status.queue_position, Some(4));
        assert!(status.image_url.is_none());
    }
}
