use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global tracing subscriber for the configured level and
/// format. Fails if a subscriber is already installed; metrics get their
/// descriptions only after a successful install.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let installed = match logging.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
    };
    installed
        .map_err(|err| InfraError::telemetry(format!("tracing subscriber rejected: {err}")))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "brezza_route_cache_hit_total",
            Unit::Count,
            "Total number of route-match cache hits."
        );
        describe_counter!(
            "brezza_route_cache_miss_total",
            Unit::Count,
            "Total number of route-match cache misses."
        );
        describe_counter!(
            "brezza_route_cache_evict_total",
            Unit::Count,
            "Total number of route-match cache evictions due to capacity."
        );
        describe_counter!(
            "brezza_asset_cache_hit_total",
            Unit::Count,
            "Total number of compressed-artifact cache hits."
        );
        describe_counter!(
            "brezza_asset_cache_miss_total",
            Unit::Count,
            "Total number of compressed-artifact cache misses."
        );
        describe_counter!(
            "brezza_asset_cache_evict_total",
            Unit::Count,
            "Total number of compressed-artifact evictions due to capacity."
        );
        describe_histogram!(
            "brezza_asset_gzip_ms",
            Unit::Milliseconds,
            "Gzip compression latency in milliseconds."
        );
    });
}
