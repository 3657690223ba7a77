use opentelemetry::{global, trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{RandomIdGenerator, SdkTracerProvider},
    Resource,
};
use opentelemetry_semantic_conventions::attribute::DEPLOYMENT_ENVIRONMENT_NAME;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Request, Response,
};
use tracing::{Level, Span};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn environment() -> String {
    std::env::var("ROCKET_PROFILE").unwrap_or_else(|_| "dev".to_string())
}

fn init_tracer(endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let resource = Resource::builder()
        .with_service_name(env!("CARGO_PKG_NAME"))
        .with_attribute(KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, environment()))
        .build();
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());
    Ok(provider)
}

/// Installs the global subscriber: stdout, sentry, and OTLP export when an
/// endpoint is given. `LOG_LEVEL` overrides the default `info` level.
pub fn init_tracing_subscriber(endpoint: Option<String>) -> anyhow::Result<OtelGuard> {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer());

    let provider = if let Some(endpoint) = endpoint {
        let provider = init_tracer(&endpoint)?;
        let tracer = provider.tracer("battledex");
        subscriber.with(OpenTelemetryLayer::new(tracer)).init();

        Some(provider)
    } else {
        subscriber.init();
        tracing::warn!("No OTLP_ENDPOINT specified, not enabling opentelemetry");
        None
    };

    Ok(OtelGuard { provider })
}

pub struct OtelGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            let _ = provider.shutdown();
        }
    }
}

/// Names the request span after the matched route.
pub struct RouteSpanFairing;

#[rocket::async_trait]
impl Fairing for RouteSpanFairing {
    fn info(&self) -> Info {
        Info {
            name: "Route span naming",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, _res: &mut Response<'r>) {
        let Some(route) = req.route() else { return };
        Span::current().record("otel.name", route.uri.to_string());
    }
}
