//! Layered application configuration.
//!
//! Sources, lowest precedence first:
//! 1. Bundled defaults (include_str! from fabula.toml)
//! 2. `~/.config/fabula/fabula.toml`
//! 3. `./fabula.toml`
//! 4. An explicit file passed on the command line
//! 5. `FABULA__SECTION__KEY` environment variables

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use derive_getters::Getters;
use fabula_cache::CacheConfig;
use fabula_error::{ConfigError, FabulaResult};
use fabula_models::{ImageServiceConfig, ModelConfig};
use fabula_worker::{ImageConfig, QueueConfig, TranslationConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_CONFIG: &str = include_str!("../fabula.toml");

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct DatabaseConfig {
    /// Connection URL
    #[serde(default)]
    url: Option<String>,

    /// Maximum pooled connections
    #[serde(default = "default_pool_size")]
    pool_size: u32,
}

fn default_pool_size() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
        }
    }
}

impl DatabaseConfig {
    /// The configured URL, or `DATABASE_URL` from the environment.
    pub fn resolved_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
    }
}

/// Durable media storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct StorageConfig {
    /// Root directory for stored assets
    #[serde(default = "default_storage_path")]
    path: PathBuf,

    /// URL prefix the root is served under
    #[serde(default)]
    public_base_url: Option<String>,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./media")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            public_base_url: None,
        }
    }
}

/// Complete configuration of a Fabula process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
pub struct FabulaConfig {
    /// PostgreSQL connection
    #[serde(default)]
    database: DatabaseConfig,

    /// Chapter and translation model endpoint
    #[serde(default)]
    generation: ModelConfig,

    /// Cover image service endpoint
    #[serde(default)]
    image_service: ImageServiceConfig,

    /// Durable cover storage
    #[serde(default)]
    storage: StorageConfig,

    /// Chapter generation queue
    #[serde(default)]
    queue: QueueConfig,

    /// Cover image scheduler
    #[serde(default)]
    images: ImageConfig,

    /// Translation waits
    #[serde(default)]
    translation: TranslationConfig,

    /// Translation cache
    #[serde(default)]
    cache: CacheConfig,
}

impl FabulaConfig {
    /// Load configuration from every standard source.
    pub fn load() -> FabulaResult<Self> {
        Self::load_with(None)
    }

    /// Load configuration, layering `explicit` above the standard files.
    ///
    /// # Errors
    ///
    /// Fails when `explicit` does not exist or any source does not parse.
    pub fn load_with(explicit: Option<&Path>) -> FabulaResult<Self> {
        debug!("Loading configuration with precedence: env > explicit > current dir > home dir > bundled defaults");

        let mut builder = Self::bundled_builder();

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/fabula/fabula.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("fabula").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("FABULA")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("images.backoff_minutes"),
        );

        Self::finish(builder)
    }

    /// The bundled defaults alone.
    pub fn bundled() -> FabulaResult<Self> {
        Self::finish(Self::bundled_builder())
    }

    /// The bundled defaults overridden by a TOML document.
    pub fn from_toml_str(toml: &str) -> FabulaResult<Self> {
        Self::finish(
            Self::bundled_builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    fn bundled_builder() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> FabulaResult<Self> {
        let config = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;
        Ok(config)
    }
}
