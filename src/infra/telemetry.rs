use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "gitreader_render_total",
            Unit::Count,
            "Total number of Markdown documents rendered."
        );
        describe_counter!(
            "gitreader_render_degraded_total",
            Unit::Count,
            "Renders that fell back to escaped raw text."
        );
        describe_histogram!(
            "gitreader_render_ms",
            Unit::Milliseconds,
            "Markdown render latency in milliseconds."
        );
        describe_counter!(
            "gitreader_render_cache_hits_total",
            Unit::Count,
            "Render cache hits."
        );
        describe_counter!(
            "gitreader_render_cache_misses_total",
            Unit::Count,
            "Render cache misses."
        );
        describe_counter!(
            "gitreader_upstream_errors_total",
            Unit::Count,
            "Failed calls to GitHub, labelled by provider and error kind."
        );
    });
}
