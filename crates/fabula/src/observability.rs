//! Subscriber installation for the `fabula` binary.
//!
//! Filtering honours `RUST_LOG` and falls back to the configured level.
//! Output is human text or one JSON object per line; with the
//! `observability` feature spans are also exported to stdout through
//! OpenTelemetry.

use derive_getters::Getters;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// How the process reports its logs and spans.
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_setters::Setters)]
#[setters(prefix = "with_", into)]
pub struct ObservabilityConfig {
    /// Reported as `service.name` on exported spans
    service_name: String,
    /// Reported as `service.version` on exported spans
    service_version: String,
    /// Filter directive used when `RUST_LOG` is unset
    log_level: String,
    /// One JSON object per event instead of text
    json_logs: bool,
    /// Print the emitting module of every event
    targets: bool,
}

impl ObservabilityConfig {
    /// Defaults for `service_name`: `info`, text output, targets shown.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            targets: true,
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error>> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::try_new(&self.log_level)?),
        }
    }

    fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + 'static,
    {
        let layer = tracing_subscriber::fmt::layer().with_target(self.targets);
        if self.json_logs {
            layer.json().boxed()
        } else {
            layer.boxed()
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

/// Install the global subscriber.
#[cfg(not(feature = "observability"))]
pub fn init_observability(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(config.fmt_layer())
        .try_init()?;
    Ok(())
}

/// Install the global subscriber and a stdout OpenTelemetry span exporter.
#[cfg(feature = "observability")]
pub fn init_observability(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    use opentelemetry::{KeyValue, global, trace::TracerProvider};
    use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};

    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
        .with_resource(
            Resource::builder()
                .with_service_name(config.service_name.clone())
                .with_attribute(KeyValue::new(
                    "service.version",
                    config.service_version.clone(),
                ))
                .build(),
        )
        .build();
    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(config.service_name.clone());

    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(config.fmt_layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_override_defaults() {
        let config = ObservabilityConfig::default()
            .with_log_level("debug")
            .with_json_logs(true);

        assert_eq!(config.service_name(), "fabula");
        assert_eq!(config.log_level(), "debug");
        assert!(*config.json_logs());
        assert!(*config.targets());
    }
}
