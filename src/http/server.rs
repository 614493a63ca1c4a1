//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all registry routes and `/health`
//! - Wire up middleware (request ID, tracing, timeout, request metrics)
//! - Serve on a bound listener until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{MatchedPath, Request};
use axum::http::Request as HttpRequest;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::blockchain::ChainConnector;
use crate::config::ListenerConfig;
use crate::http::handlers;
use crate::http::request::{request_id_of, MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;
use crate::registry::Registry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    /// Connector used for health reporting.
    pub chain: Arc<dyn ChainConnector>,
}

/// Build the Axum router with all middleware layers.
///
/// Writes carry their own, longer deadline so a slow confirmation ends in the
/// submitter's unconfirmed result rather than a bare 408.
#[allow(deprecated)]
pub fn build_router(state: AppState, config: &ListenerConfig) -> Router {
    let writes = Router::new()
        .route("/verify_user", post(handlers::verify_user))
        .route("/submit_project", post(handlers::submit_project))
        .route("/submit_review", post(handlers::submit_review))
        .route_layer(TimeoutLayer::new(Duration::from_secs(config.write_timeout_secs)));

    let reads = Router::new()
        .route("/get_all_projects/{builder}", get(handlers::get_all_projects))
        .route("/get_projects_for_client/{client}", get(handlers::get_projects_for_client))
        .route("/health", get(handlers::health))
        .route_layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)));

    writes
        .merge(reads)
        .with_state(state)
        .layer(middleware::from_fn(track_requests))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &HttpRequest<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id_of(request),
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
}

/// Count responses by route template and status.
async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(endpoint, response.status().as_u16());
    response
}

/// HTTP server for the registry gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(state: AppState, config: &ListenerConfig) -> Self {
        Self {
            router: build_router(state, config),
        }
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
