//! Logging and metrics initialization
//!
//! Structured JSON logging via `tracing` with bunyan formatting. Metrics go
//! through the `metrics` facade; wiring an exporter is the deployment's
//! concern.

use crate::config::AppConfig;
use tracing::{subscriber::set_global_default, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

/// Compose a subscriber from an env filter and an output sink.
///
/// Split from [`init_telemetry`] so tests can install their own subscriber
/// against an in-memory sink.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: &str,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Install the global subscriber and the log-to-tracing bridge. Call once
/// at startup.
pub fn init_telemetry(config: &AppConfig) {
    LogTracer::init().expect("failed to initialize log tracer");

    let subscriber = get_subscriber(
        format!("identity-service-{}", config.environment),
        config.log_level(),
        std::io::stdout,
    );
    set_global_default(subscriber).expect("failed to set tracing subscriber");
}
