//! Clients for the external generation services.
//!
//! - [`ChatClient`] speaks the OpenAI-compatible chat completions protocol and
//!   implements both [`ChapterGenerator`](fabula_interface::ChapterGenerator)
//!   and [`Translator`](fabula_interface::Translator).
//! - [`ImageServiceClient`] submits cover prompts to the image service, polls
//!   their status and downloads finished assets.
//!
//! Model output is parsed by [`parse_chapter`], which rejects malformed
//! responses with a typed [`GenerationError`](fabula_error::GenerationError)
//! instead of producing empty chapters.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod dto;
mod image;
mod parser;
mod prompt;

pub use client::{ChatClient, ChatCompletion};
pub use config::{ImageServiceConfig, ModelConfig, ModelConfigBuilder};
pub use dto::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, ChatUsage, ImageGeneration,
    ImageStatusResponse, ImageSubmitRequest, ImageSubmitResponse,
};
pub use image::ImageServiceClient;
pub use parser::{Section, parse_chapter};
pub use prompt::{chapter_prompt, system_prompt, translation_prompt, translator_system_prompt};
