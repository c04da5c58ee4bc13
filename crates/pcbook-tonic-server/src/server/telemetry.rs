//! Logging, tracing and metrics setup for the laptop server.
//!
//! A pretty `fmt` layer filtered by `RUST_LOG` (default `info`) is always
//! installed. OpenTelemetry export is opt-in through cargo features:
//!
//! | Feature     | Effect                                                   |
//! |-------------|----------------------------------------------------------|
//! | `tracing`   | Handler spans are exported as OpenTelemetry traces.      |
//! | `metrics`   | Call counters and histograms are exported.               |
//! | `stdout`    | Export to stdout every five seconds.                     |
//! | `honeycomb` | Export over OTLP/gRPC to Honeycomb (see env vars below). |
//!
//! Exporters need at least one of `tracing` or `metrics`. Both exporters may be
//! enabled together.
//!
//! Honeycomb reads `HONEYCOMB_API_KEY`, `HONEYCOMB_DATASET`,
//! `HONEYCOMB_ENDPOINT` and `HONEYCOMB_COMPRESSION` (`gzip` or `zstd`).
//!
//! Events emitted outside a span only reach the console; events inside a span
//! become span events in the exporter.
//!
//! ```bash
//! cargo run --features tracing,metrics,stdout
//! ```
//!
//! Every metric helper below compiles to a no-op without `metrics`, so call
//! sites never need their own `cfg` gates.

#[cfg(all(
    any(feature = "honeycomb", feature = "stdout"),
    not(any(feature = "tracing", feature = "metrics"))
))]
compile_error!("The `honeycomb` and `stdout` exporters need `tracing` or `metrics` to be enabled.");

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(all(feature = "honeycomb", any(feature = "metrics", feature = "tracing")))]
use opentelemetry_otlp::{Compression, Protocol, WithExportConfig, WithTonicConfig};
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_sdk::Resource;
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::trace as sdktrace;
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_semantic_conventions as semvcns;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
#[cfg(feature = "honeycomb")]
use tonic::{metadata::MetadataMap, transport::ClientTlsConfig};

#[cfg(any(feature = "stdout", all(feature = "honeycomb", feature = "tracing")))]
const EXPORT_INTERVAL: core::time::Duration = core::time::Duration::from_secs(5);
#[cfg(feature = "honeycomb")]
const EXPORT_TIMEOUT: core::time::Duration = core::time::Duration::from_secs(10);

/// Name shared by the OpenTelemetry resource and instrumentation scope.
#[cfg(any(feature = "metrics", feature = "tracing"))]
const SERVICE_NAME: &str = "pcbook";

/// The exporting providers installed by [`init_telemetry`]. Hand them to
/// [`TelemetryProviders::shutdown`] once the server has stopped.
pub struct TelemetryProviders {
    #[cfg(feature = "tracing")]
    tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes pending spans and metrics, then stops the exporters. Failures
    /// go to stderr since the subscriber may already be gone.
    pub fn shutdown(self) {
        #[cfg(feature = "tracing")]
        {
            let tracer = self.tracer_provider;
            if let Err(err) = tracer.force_flush().and_then(|()| tracer.shutdown()) {
                eprintln!("Error shutting down tracer provider: {err:#?}");
            }
        }

        #[cfg(feature = "metrics")]
        {
            let meter = self.meter_provider;
            if let Err(err) = meter.force_flush().and_then(|()| meter.shutdown()) {
                eprintln!("Error shutting down meter provider: {err:#?}");
            }
        }
    }
}

/// Installs the global subscriber: `RUST_LOG` filtering (default `info`), the
/// console layer and whichever OpenTelemetry layers are compiled in.
pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    let console = tracing_subscriber::fmt::layer()
        .pretty()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter).with(console);

    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    #[cfg(feature = "tracing")]
    let (subscriber, tracer_provider) = {
        use opentelemetry::trace::TracerProvider;

        let provider = init_tracer()?;
        opentelemetry::global::set_text_map_propagator(
            opentelemetry_sdk::propagation::TraceContextPropagator::new(),
        );
        opentelemetry::global::set_tracer_provider(provider.clone());
        let layer = tracing_opentelemetry::layer()
            .with_tracer(provider.tracer_with_scope(scope.clone()))
            .with_error_records_to_exceptions(true);
        (subscriber.with(layer), provider)
    };

    #[cfg(feature = "metrics")]
    let (subscriber, meter_provider) = {
        let provider = init_metrics()?;
        opentelemetry::global::set_meter_provider(provider.clone());
        init_metric_handles(opentelemetry::global::meter_with_scope(scope));
        let layer = tracing_opentelemetry::MetricsLayer::new(provider.clone());
        (subscriber.with(layer), provider)
    };

    subscriber.init();

    Ok(TelemetryProviders {
        #[cfg(feature = "tracing")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

/// Connection settings for the Honeycomb OTLP endpoint, read from the
/// environment.
#[cfg(feature = "honeycomb")]
struct HoneycombTarget {
    metadata: MetadataMap,
    endpoint: String,
    compression: Compression,
}

#[cfg(feature = "honeycomb")]
impl HoneycombTarget {
    fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;
        use std::str::FromStr;

        let api_key = std::env::var("HONEYCOMB_API_KEY").context("missing `HONEYCOMB_API_KEY`")?;
        let dataset = std::env::var("HONEYCOMB_DATASET").context("missing `HONEYCOMB_DATASET`")?;
        let endpoint =
            std::env::var("HONEYCOMB_ENDPOINT").context("missing `HONEYCOMB_ENDPOINT`")?;
        let compression = std::env::var("HONEYCOMB_COMPRESSION")
            .context("missing `HONEYCOMB_COMPRESSION`")?
            .to_ascii_lowercase();

        let mut metadata = MetadataMap::new();
        metadata.insert(
            "x-honeycomb-team",
            api_key.parse().context("invalid API key")?,
        );
        metadata.insert(
            "x-honeycomb-dataset",
            dataset.parse().context("invalid dataset")?,
        );

        Ok(Self {
            metadata,
            endpoint,
            compression: Compression::from_str(&compression)?,
        })
    }
}

#[cfg(any(feature = "metrics", feature = "tracing"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> anyhow::Result<sdkmetrics::SdkMeterProvider> {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        let reader = sdkmetrics::PeriodicReader::builder(
            opentelemetry_stdout::MetricExporter::default(),
        )
        .with_interval(EXPORT_INTERVAL)
        .build();

        builder.with_reader(reader)
    };

    #[cfg(feature = "honeycomb")]
    let builder = {
        use anyhow::Context;

        let target = HoneycombTarget::from_env()?;
        let exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_tls_config(ClientTlsConfig::new().with_native_roots())
            .with_metadata(target.metadata)
            .with_timeout(EXPORT_TIMEOUT)
            .with_compression(target.compression)
            .with_endpoint(target.endpoint)
            .with_protocol(Protocol::Grpc)
            .with_temporality(sdkmetrics::Temporality::Delta)
            .build()
            .context("failed to build metrics exporter")?;

        builder.with_periodic_exporter(exporter)
    };

    Ok(builder.build())
}

#[cfg(all(feature = "tracing", any(feature = "stdout", feature = "honeycomb")))]
fn batch_processor<E>(exporter: E) -> sdktrace::BatchSpanProcessor
where
    E: opentelemetry_sdk::trace::SpanExporter + 'static,
{
    sdktrace::BatchSpanProcessor::builder(exporter)
        .with_batch_config(
            sdktrace::BatchConfigBuilder::default()
                .with_scheduled_delay(EXPORT_INTERVAL)
                .with_max_queue_size(2048)
                .build(),
        )
        .build()
}

#[cfg(feature = "tracing")]
fn init_tracer() -> anyhow::Result<sdktrace::SdkTracerProvider> {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder =
        builder.with_span_processor(batch_processor(opentelemetry_stdout::SpanExporter::default()));

    #[cfg(feature = "honeycomb")]
    let builder = {
        use anyhow::Context;

        let target = HoneycombTarget::from_env()?;
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_tls_config(ClientTlsConfig::new().with_native_roots())
            .with_metadata(target.metadata)
            .with_timeout(EXPORT_TIMEOUT)
            .with_compression(target.compression)
            .with_endpoint(target.endpoint)
            .with_protocol(Protocol::Grpc)
            .build()
            .context("failed to build tracer exporter")?;

        builder.with_span_processor(batch_processor(exporter))
    };

    Ok(builder.build())
}

/// Instruments for the laptop service, created once the meter provider is up.
#[cfg(feature = "metrics")]
struct Metrics {
    calls: Counter<u64>,
    calls_inflight: UpDownCounter<i64>,
    call_errors: Counter<u64>,
    call_duration_ms: Histogram<f64>,
    laptops_found: Counter<u64>,
    image_bytes: Counter<u64>,
    ratings_applied: Counter<u64>,
}

#[cfg(feature = "metrics")]
static METRICS: OnceLock<Metrics> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = METRICS.set(Metrics {
        calls: meter
            .u64_counter("calls")
            .with_description("Total gRPC calls accepted, by method")
            .build(),
        calls_inflight: meter
            .i64_up_down_counter("calls_inflight")
            .with_description("Concurrent gRPC calls, by method")
            .build(),
        call_errors: meter
            .u64_counter("errors")
            .with_description("Calls that ended with an error status, by method")
            .build(),
        call_duration_ms: meter
            .f64_histogram("call_duration")
            .with_unit("ms")
            .with_description("End-to-end call duration, by method")
            .build(),
        laptops_found: meter
            .u64_counter("laptops_found")
            .with_description("Laptops streamed back by SearchLaptop")
            .build(),
        image_bytes: meter
            .u64_counter("image_bytes")
            .with_unit("By")
            .with_description("Image bytes persisted by UploadImage")
            .build(),
        ratings_applied: meter
            .u64_counter("ratings_applied")
            .with_description("Scores folded into rating aggregates")
            .build(),
    });
}

#[cfg(feature = "metrics")]
fn method_attr(method: &'static str) -> [KeyValue; 1] {
    [KeyValue::new("rpc.method", method)]
}

// The helpers below are no-ops until `init_metric_handles` has run, and always
// without the `metrics` feature.

pub fn increment_calls(_method: &'static str) {
    #[cfg(feature = "metrics")]
    if let Some(m) = METRICS.get() {
        m.calls.add(1, &method_attr(_method));
    }
}

pub fn increment_calls_inflight(_method: &'static str) {
    #[cfg(feature = "metrics")]
    if let Some(m) = METRICS.get() {
        m.calls_inflight.add(1, &method_attr(_method));
    }
}

pub fn decrement_calls_inflight(_method: &'static str) {
    #[cfg(feature = "metrics")]
    if let Some(m) = METRICS.get() {
        m.calls_inflight.add(-1, &method_attr(_method));
    }
}

pub fn increment_call_errors(_method: &'static str) {
    #[cfg(feature = "metrics")]
    if let Some(m) = METRICS.get() {
        m.call_errors.add(1, &method_attr(_method));
    }
}

pub fn record_call_duration(_method: &'static str, _duration_ms: f64) {
    #[cfg(feature = "metrics")]
    if let Some(m) = METRICS.get() {
        m.call_duration_ms.record(_duration_ms, &method_attr(_method));
    }
}

pub fn increment_laptops_found(_count: u64) {
    #[cfg(feature = "metrics")]
    if let Some(m) = METRICS.get() {
        m.laptops_found.add(_count, &[]);
    }
}

pub fn increment_image_bytes(_count: u64) {
    #[cfg(feature = "metrics")]
    if let Some(m) = METRICS.get() {
        m.image_bytes.add(_count, &[]);
    }
}

pub fn increment_ratings_applied() {
    #[cfg(feature = "metrics")]
    if let Some(m) = METRICS.get() {
        m.ratings_applied.add(1, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_helpers_are_inert_before_init() {
        increment_calls("CreateLaptop");
        increment_calls_inflight("CreateLaptop");
        decrement_calls_inflight("CreateLaptop");
        increment_call_errors("CreateLaptop");
        record_call_duration("CreateLaptop", 1.5);
        increment_laptops_found(3);
        increment_image_bytes(1024);
        increment_ratings_applied();
        #[cfg(feature = "metrics")]
        assert!(METRICS.get().is_none());
    }
}
