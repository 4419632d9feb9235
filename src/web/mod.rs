//! HTTP surface: shared state, routing and server lifecycle.

mod assets;
mod pages;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::config::Config;
use crate::errors::BuildError;
use crate::pipeline::BuildPipeline;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: BuildPipeline,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config) -> SharedState {
        let config = Arc::new(config);
        Arc::new(Self {
            pipeline: BuildPipeline::new(Arc::clone(&config)),
            config,
        })
    }
}

// ── Error mapping ─────────────────────────────────────────────────────

/// Errors surfaced to HTTP clients on the non-streaming routes.
pub enum WebError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            WebError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, message).into_response()
    }
}

impl From<BuildError> for WebError {
    fn from(err: BuildError) -> Self {
        WebError::Internal(err.to_string())
    }
}

impl From<askama::Error> for WebError {
    fn from(err: askama::Error) -> Self {
        WebError::Internal(format!("template error: {err}"))
    }
}

// ── Router and lifecycle ──────────────────────────────────────────────

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/repo/{repo_name}", get(routes::repo))
        .route("/repo/{repo_name}/{branch}/get", get(routes::build_status))
        .route("/repo/{repo_name}/{branch}/build", get(routes::run_build))
        .route("/repo/{repo_name}/{branch}/{file}", get(routes::artifact))
        .route("/static/{*path}", get(assets::static_handler))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn start_server(config: Config, port: u16) -> Result<()> {
    let state = AppState::new(config);
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("hangar listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutting down");
}
