use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod caller;
mod config;
pub mod error;
mod handlers;
mod health;
pub mod session;
mod volume;

pub use config::Config;

use crate::ServiceState;

const STATUS_PREFIX: &str = "/_status";
const VOLUME_PREFIX: &str = "/volume";

/// Maximum upload size in bytes (256 MB)
pub const MAX_UPLOAD_SIZE_BYTES: usize = 256 * 1024 * 1024;

/// All routes, without tracing. Login routes exist only when an identity
///  provider is configured.
pub fn router(state: ServiceState) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::index::handler))
        .route("/user", get(handlers::account::user_handler))
        .route("/token", get(handlers::account::token_handler))
        .route("/s/:code", get(handlers::share_link::handler))
        .nest(VOLUME_PREFIX, volume::router(state.clone()))
        .nest(STATUS_PREFIX, health::router(state.clone()));

    if state.identity().is_some() {
        router = router
            .route("/discord/login", get(handlers::discord::login_handler))
            .route(
                crate::identity::CALLBACK_PATH,
                get(handlers::discord::callback_handler),
            )
            .route("/discord/logout", get(handlers::discord::logout_handler));
    }

    router
        .fallback(handlers::not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE_BYTES))
        .with_state(state)
}

/// Run the HTTP server until `shutdown_rx` fires.
pub async fn run(
    config: Config,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listen_addr = config.listen_addr;
    let log_level = config.log_level;
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let router = router(state).layer(trace_layer);

    tracing::info!(addr = ?listen_addr, "HTTP server listening");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
