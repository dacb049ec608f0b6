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

pub const VIEW_RESOLVED_TOTAL: &str = "vista_view_resolved_total";
pub const VIEW_MISSING_TOTAL: &str = "vista_view_missing_total";
pub const VIEW_CANDIDATES_PROBED: &str = "vista_view_candidates_probed";
pub const DISPATCH_UNAVAILABLE_TOTAL: &str = "vista_dispatch_unavailable_total";

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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            VIEW_RESOLVED_TOTAL,
            Unit::Count,
            "Total number of views resolved to a dispatchable template."
        );
        describe_counter!(
            VIEW_MISSING_TOTAL,
            Unit::Count,
            "Total number of view lookups that exhausted every type level."
        );
        describe_histogram!(
            VIEW_CANDIDATES_PROBED,
            Unit::Count,
            "Candidate template paths probed per view lookup."
        );
        describe_counter!(
            DISPATCH_UNAVAILABLE_TOTAL,
            Unit::Count,
            "Total number of include/forward calls with no dispatcher for the path."
        );
    });
}
