//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router over a shared [`ListingClient`]
//! - Wire up middleware (request id, tracing, timeout)
//! - Serve until shutdown, then close the gateway session

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::handlers;
use crate::lifecycle::Shutdown;
use crate::listings::ListingClient;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ListingClient>,
}

/// REST server for the listing gateway.
pub struct ApiServer {
    router: Router,
    client: Arc<ListingClient>,
}

impl ApiServer {
    pub fn new(client: Arc<ListingClient>, request_timeout: Duration) -> Self {
        let router = build_router(
            AppState {
                client: Arc::clone(&client),
            },
            request_timeout,
        );
        Self { router, client }
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        self.client.close();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/listings", get(handlers::list_listings).post(handlers::create_listing))
        .route("/listings/{id}/purchase", post(handlers::purchase_listing))
        .route("/account", get(handlers::get_account))
        .route("/health", get(handlers::get_health))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                request_id = %request_id,
                method = %request.method(),
                path = %request.uri().path(),
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
