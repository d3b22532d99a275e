//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum Router with the gateway's own handlers
//! - Wrap every route, fallback included, in the gateway middleware
//! - Wire up tower layers (request ID, tracing, timeout, body limit)
//! - Forward passed requests to the upstream, when one is configured
//! - Run the counter sweeper alongside the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin::admin_router;
use crate::config::ConfigError;
use crate::gateway::{gateway_middleware, Gateway};
use crate::http::handlers;
use crate::http::request_id::{
    request_id, PropagateRequestIdLayer, SetRequestIdLayer, UuidRequestId,
};
use crate::http::upstream::Upstream;
use crate::lifecycle::Shutdown;
use crate::security::CounterSweeper;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub upstream: Option<Upstream>,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>) -> Result<Self, ConfigError> {
        let upstream = gateway
            .config()
            .upstream
            .url
            .as_deref()
            .map(Upstream::new)
            .transpose()
            .map_err(|e| ConfigError::Validation(vec![e]))?;
        Ok(Self { gateway, upstream })
    }
}

/// HTTP front end of the gateway.
pub struct GatewayServer {
    router: Router,
    gateway: Arc<Gateway>,
}

impl GatewayServer {
    pub fn new(gateway: Arc<Gateway>) -> Result<Self, ConfigError> {
        let state = AppState::new(gateway.clone())?;
        if let Some(upstream) = &state.upstream {
            tracing::info!(upstream = %upstream.authority(), "Forwarding passed requests");
        }
        Ok(Self {
            router: build_router(state),
            gateway,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweep_every =
            Duration::from_secs(self.gateway.config().counter_store.sweep_interval_secs);
        let sweeper = CounterSweeper::new(self.gateway.counters().clone(), sweep_every)
            .spawn(shutdown.subscribe());

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await;

        sweeper.abort();
        served?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Router with every layer applied. Layers listed later wrap earlier ones.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.gateway.config().timeouts.request_secs);
    let body_limit = state.gateway.config().security.max_body_size;
    let gateway = state.gateway.clone();

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/me", get(handlers::me))
        .merge(admin_router())
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(gateway, gateway_middleware))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id(request),
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .with_state(state)
}

/// Requests that passed the gateway but match no local handler.
async fn fallback(State(state): State<AppState>, request: Request) -> Response {
    match &state.upstream {
        Some(upstream) => {
            tracing::debug!(path = %request.uri().path(), "Forwarding to upstream");
            upstream.forward(request).await
        }
        None => handlers::not_found().await,
    }
}
