//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use transfers_types::{AccountRepository, TransferRepository};

use super::handlers::{self, AppState};
use crate::openapi::ApiDoc;
use crate::service::{TransferService, UserService};

/// HTTP Server for the Transfers API.
pub struct HttpServer<R: AccountRepository + TransferRepository> {
    state: Arc<AppState<R>>,
}

impl<R: AccountRepository + TransferRepository> HttpServer<R> {
    pub fn new(users: UserService<R>, transfers: TransferService<R>) -> Self {
        Self {
            state: Arc::new(AppState { users, transfers }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let request_ids = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request| {
                    let request_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        uri = %req.uri(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id());

        Router::new()
            .route("/health", get(handlers::health))
            .route("/transfers", post(handlers::create_transfer::<R>))
            .route("/transfers/{id}", get(handlers::get_transfer::<R>))
            .route("/users", post(handlers::create_user::<R>))
            .route("/users/{id}", get(handlers::get_user::<R>))
            .route(
                "/users/{id}/transfers",
                get(handlers::list_user_transfers::<R>),
            )
            .layer(metrics)
            .layer(request_ids)
            .with_state(self.state.clone())
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
