use std::sync::OnceLock;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::TelemetryError;

const DEFAULT_DIRECTIVES: &str = "warn";

static TRACING_INITIALISED: OnceLock<Result<(), TelemetryError>> = OnceLock::new();

/// Installs the process-wide subscriber: filtered log lines on stderr plus an
/// OpenTelemetry layer.
///
/// Only the first call installs anything; later calls return its result.
pub(crate) fn initialise_tracing(
    service_name: &str,
    interactive_terminal: bool,
    level_override: Option<LevelFilter>,
) -> Result<(), &'static TelemetryError> {
    TRACING_INITIALISED
        .get_or_init(|| {
            let tracer_provider = SdkTracerProvider::builder().build();
            let tracer = tracer_provider.tracer(service_name.to_owned());
            global::set_tracer_provider(tracer_provider);

            tracing_subscriber::registry()
                .with(stderr_layer(interactive_terminal).with_filter(log_filter(level_override)))
                .with(OpenTelemetryLayer::new(tracer))
                .try_init()
                .map_err(TelemetryError::from)
        })
        .as_ref()
        .copied()
}

/// Pretty multi-line events on a terminal, one JSON object per event otherwise.
fn stderr_layer<S>(interactive_terminal: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    if interactive_terminal {
        layer.pretty().boxed()
    } else {
        layer.json().with_current_span(true).boxed()
    }
}

/// An explicit level only raises or lowers this crate's events; dependencies
/// stay at `warn`. Without one, `RUST_LOG` applies as usual.
fn log_filter(level_override: Option<LevelFilter>) -> EnvFilter {
    match level_override {
        Some(level) => EnvFilter::new(format!("{DEFAULT_DIRECTIVES},pjcontrol={level}")),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn level_override_targets_this_crate() {
        let filter = log_filter(Some(LevelFilter::DEBUG));

        assert_eq!(Some(LevelFilter::DEBUG), filter.max_level_hint());
    }
}
