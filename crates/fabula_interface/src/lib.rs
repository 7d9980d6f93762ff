//! Trait definitions for the Fabula workspace.
//!
//! Two kinds of seams live here:
//!
//! - **Clients** for external collaborators: [`ChapterGenerator`] and
//!   [`Translator`] wrap the generative model, [`ImageService`] wraps the
//!   image-generation service.
//! - **Stores** for persisted state: [`JobStore`], [`StoryStore`],
//!   [`TranslationCacheStore`] and [`ConversationLogStore`].
//!
//! The worker and cache crates are written against these traits only, so the
//! PostgreSQL implementations and the in-memory ones used in tests are
//! interchangeable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clients;
mod stores;

pub use clients::{ChapterGenerator, ChapterRequest, GeneratedChapter, ImageService, Translation, Translator};
pub use stores::{ConversationLogStore, JobStore, StoryStore, TranslationCacheStore};
