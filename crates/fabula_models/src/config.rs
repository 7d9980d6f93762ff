//! Endpoint configuration for the generation services.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Chat completions endpoint and sampling parameters.
///
/// # Examples
///
/// ```
/// use fabula_models::ModelConfig;
///
/// let config = ModelConfig::default().with_model("gpt-4o-mini".to_string());
/// assert_eq!(config.model(), "gpt-4o-mini");
/// assert_eq!(*config.max_tokens(), 4096);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(setter(into), default)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API, without `/chat/completions`
    #[serde(default = "default_base_url")]
    base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    model: String,

    /// Bearer token, when the endpoint requires one
    #[serde(default)]
    api_key: Option<String>,

    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    temperature: f32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.8
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Image-generation service endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct ImageServiceConfig {
    /// Base URL of the service
    #[serde(default = "default_image_base_url")]
    base_url: String,

    /// API key sent in the `apikey` header
    #[serde(default)]
    api_key: Option<String>,

    /// Model to request, service default when unset
    #[serde(default)]
    model: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_image_timeout_secs")]
    timeout_secs: u64,
}

fn default_image_base_url() -> String {
    "http://localhost:7860/api/v2".to_string()
}

fn default_image_timeout_secs() -> u64 {
    60
}

impl Default for ImageServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_image_base_url(),
            api_key: None,
            model: None,
            timeout_secs: default_image_timeout_secs(),
        }
    }
}
