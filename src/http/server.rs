//! HTTP server setup for the sidecar.
//!
//! # Responsibilities
//! - Build the axum router: allow-listed proxy paths + control endpoints
//! - Wire up middleware (tracing, request timeout, request ID)
//! - Serve with graceful shutdown
//!
//! Unlisted paths 404 locally; they never reach the routing engine.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::response::Response;
use axum::routing::{any, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::http::proxy::ReverseProxy;
use crate::http::request::MakeRequestUuid;
use crate::http::{handlers, ALERTS_PATH, AM_RECEIVERS_PATH, SIDECAR_INIT_PATH,
    SIDECAR_RECEIVERS_PATH, SIDECAR_RECEIVER_PATH, SILENCES_PATH, SILENCE_ITEM_PATH};
use crate::lifecycle::ShutdownListener;
use crate::settings::SidecarSettings;
use crate::store::ConfigStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub proxy: ReverseProxy,
}

pub struct SidecarServer {
    router: Router,
}

impl SidecarServer {
    pub fn new(settings: &SidecarSettings, store: Arc<ConfigStore>) -> Result<Self> {
        let proxy = ReverseProxy::new(&settings.upstream_url()?)?;
        let state = AppState { store, proxy };
        Ok(Self {
            router: Self::build_router(settings, state),
        })
    }

    fn build_router(settings: &SidecarSettings, state: AppState) -> Router {
        Router::new()
            // sidecar-private control surface
            .route(SIDECAR_INIT_PATH, post(handlers::init))
            .route(SIDECAR_RECEIVERS_PATH, get(handlers::list_receivers))
            .route(
                SIDECAR_RECEIVER_PATH,
                get(handlers::list_receivers)
                    .post(handlers::create_receiver)
                    .delete(handlers::delete_receiver),
            )
            // allow-listed pass-through to the routing engine
            .route("/", any(proxy_passthrough))
            .route(ALERTS_PATH, get(proxy_passthrough).post(proxy_passthrough))
            .route(
                SILENCES_PATH,
                get(proxy_passthrough)
                    .post(proxy_passthrough)
                    .delete(proxy_passthrough),
            )
            .route(
                SILENCE_ITEM_PATH,
                get(proxy_passthrough).delete(proxy_passthrough),
            )
            .route(AM_RECEIVERS_PATH, get(proxy_passthrough))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                settings.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for serving through a TLS-terminating server.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve plaintext on the given listener until shutdown triggers.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownListener,
    ) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "sidecar HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("sidecar HTTP server stopped");
        Ok(())
    }
}

async fn proxy_passthrough(State(state): State<AppState>, request: Request) -> Response {
    state.proxy.forward(request).await
}
