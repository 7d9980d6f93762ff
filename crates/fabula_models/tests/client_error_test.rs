//! Error mapping of the HTTP clients against an unreachable endpoint.

use fabula_core::StoryContext;
use fabula_error::{FabulaErrorKind, GenerationErrorKind, ImageServiceErrorKind};
use fabula_interface::{ChapterGenerator, ChapterRequest, ImageService};
use fabula_models::{ChatClient, ImageServiceClient, ImageServiceConfig, ModelConfig};
use uuid::Uuid;

// Nothing listens on the discard port in the test environment.
const UNREACHABLE: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn test_chat_transport_failure_is_http_error() {
    let client = ChatClient::new(ModelConfig::default().with_base_url(UNREACHABLE.to_string()))
        .unwrap();

    let request = ChapterRequest {
        story: StoryContext {
            story_id: Uuid::new_v4(),
            title: None,
            premise: "A clockmaker builds a second moon".to_string(),
            genre: None,
            language: "en".to_string(),
        },
        chapter_number: 1,
        history: vec![],
        feedback: None,
    };

    let err = client.generate_chapter(&request).await.unwrap_err();
    match err.kind() {
        FabulaErrorKind::Generation(e) => {
            assert!(matches!(e.kind, GenerationErrorKind::Http(_)));
        }
        other => panic!("unexpected error kind: {other}"),
    }
}

#[tokio::test]
async fn test_image_fetch_failure_is_transfer_error() {
    let client = ImageServiceClient::new(
        ImageServiceConfig::default().with_base_url(UNREACHABLE.to_string()),
    )
    .unwrap();

    let err = client
        .fetch(&format!("{}/tmp/cover.webp", UNREACHABLE))
        .await
        .unwrap_err();
    match err.kind() {
        FabulaErrorKind::ImageService(e) => {
            assert!(matches!(e.kind, ImageServiceErrorKind::Transfer(_)));
        }
        other => panic!("unexpected error kind: {other}"),
    }
}

#[test]
fn test_model_name_comes_from_config() {
    let client =
        ChatClient::new(ModelConfig::default().with_model("story-writer-1".to_string())).unwrap();
    assert_eq!(ChapterGenerator::model_name(&client), "story-writer-1");
}
