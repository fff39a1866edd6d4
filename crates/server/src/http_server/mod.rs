use axum::extract::DefaultBodyLimit;
use axum::Router;
use axum::http::header::{ACCEPT, CONTENT_TYPE, ORIGIN};
use axum::http::Method;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod api;
mod handlers;
mod health;

use crate::config::Config;
use crate::ServerState;

const STATUS_PREFIX: &str = "/_status";

/// Every route of the server, with body limit and CORS applied
pub fn router(config: &Config, state: ServerState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(config.log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    // Browsers may talk to the server directly; nothing here relies on cookies
    let cors = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST])
        .allow_headers(vec![ACCEPT, ORIGIN, CONTENT_TYPE])
        .allow_origin(Any)
        .allow_credentials(false);

    Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .merge(api::router(state.clone()))
        .fallback(handlers::not_found_handler)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .with_state(state)
        .layer(trace_layer)
}

/// Bind `config.listen_addr` and serve until `shutdown` fires
pub async fn run(
    config: Config,
    state: ServerState,
    shutdown: CancellationToken,
) -> Result<(), HttpServerError> {
    let listener = TcpListener::bind(config.listen_addr).await?;
    serve(listener, config, state, shutdown).await
}

/// Serve on an already-bound listener until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    config: Config,
    state: ServerState,
    shutdown: CancellationToken,
) -> Result<(), HttpServerError> {
    let router = router(&config, state);

    tracing::info!(
        addr = ?listener.local_addr()?,
        public_url = %config.public_url,
        "bootstrap server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("bootstrap server stopped");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
