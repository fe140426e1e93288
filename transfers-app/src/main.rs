//! # Transfers Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize logging and (optionally) OpenTelemetry export
//! - Initialize the repository adapter
//! - Build the authorizer and the outbox notifier
//! - Start the notification worker and the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use transfers_authorizer::HttpAuthorizer;
use transfers_hex::{HttpServer, TransferService, UserService};
use transfers_repo::{NotificationWorker, OutboxNotifier, build_repo};

use crate::config::Config;

fn init_tracer(endpoint: &str) -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("transfers-service"), provider))
}

fn init_logging(config: &Config) -> anyhow::Result<Option<sdktrace::SdkTracerProvider>> {
    let fmt_layer = if config.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let (telemetry, provider) = match &config.otlp_endpoint {
        Some(endpoint) => {
            let (tracer, provider) = init_tracer(endpoint)?;
            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(provider),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,transfers_app=debug,transfers_hex=debug".into()),
        )
        .with(telemetry)
        .init();

    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let otel_provider = init_logging(&config)?;

    tracing::info!("Starting transfers server on port {}", config.port);
    tracing::info!(
        authorizer = %config.authorizer_uri,
        max_attempts = config.retry_policy.max_attempts,
        "authorizer configured"
    );

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;

    if let Some(target) = config.notify_target_url.clone() {
        let worker = NotificationWorker::new(repo.clone(), target)
            .with_queue(config.notify_queue.clone())
            .with_secret(config.notify_secret.clone())
            .with_poll_interval(config.notify_poll_interval);
        tokio::spawn(worker.run());
    } else {
        tracing::warn!("NOTIFY_TARGET_URL not set, notifications stay queued");
    }

    let auth_budget = config.retry_policy.worst_case();
    let authorizer = HttpAuthorizer::new(config.authorizer_uri.clone(), config.retry_policy.clone());
    let notifier = OutboxNotifier::new(repo.clone(), config.notify_queue.clone());

    let repo = Arc::new(repo);
    let users = UserService::new(repo.clone());
    let transfers = TransferService::new(repo, Arc::new(authorizer), Arc::new(notifier))
        .with_auth_budget(auth_budget);

    // Create and run the HTTP server
    let server = HttpServer::new(users, transfers);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
