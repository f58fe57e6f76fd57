//! Logging and trace export setup.
//!
//! Events go to stderr through `tracing-subscriber`, filtered by `RUST_LOG`
//! (default `info`). With OTLP enabled, spans are also exported over gRPC to
//! the collector named by the standard `OTEL_EXPORTER_OTLP_*` variables.

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::SpanExporter;
use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SERVICE_NAME: &str = "supersede";

/// Keeps the trace pipeline alive; call [`Telemetry::shutdown`] before exit
/// so buffered spans are flushed.
pub struct Telemetry {
    provider: Option<TracerProvider>,
}

impl Telemetry {
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                eprintln!("warning: failed to flush traces: {e}");
            }
        }
    }
}

/// Installs the global subscriber.
pub fn init(log_json: bool, otlp: bool) -> Result<Telemetry> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = log_json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!log_json).then(|| fmt::layer().with_writer(std::io::stderr));

    let provider = if otlp {
        let exporter = SpanExporter::builder()
            .with_tonic()
            .build()
            .context("failed to build OTLP span exporter")?;
        Some(
            TracerProvider::builder()
                .with_batch_exporter(exporter, runtime::Tokio)
                .with_resource(Resource::new(vec![KeyValue::new(
                    "service.name",
                    SERVICE_NAME,
                )]))
                .build(),
        )
    } else {
        None
    };
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE_NAME)));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(otel_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(Telemetry { provider })
}

/// OTLP export is on when requested or when a collector endpoint is set.
pub fn otlp_requested(flag: bool) -> bool {
    flag || std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_some()
}
