//! HTTP API server
//!
//! A thin transport over the same [`Session`] the voice loop drives.

pub mod chat;
pub mod health;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::session::Session;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub session: Arc<Session>,
}

impl ApiState {
    #[must_use]
    pub const fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

/// Build the router with all routes
pub fn router(state: ApiState) -> Router {
    let state = Arc::new(state);

    // CORS layer for cross-origin requests from a browser UI
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(chat::router(Arc::clone(&state)))
        .merge(health::router())
        .merge(health::status_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
///
/// # Errors
///
/// Returns error if the server fails to bind or run
pub async fn serve(state: ApiState, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

    tracing::info!(port, "API server listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

    Ok(())
}

/// Run the API server in a background task; failures are logged
pub fn spawn(state: ApiState, port: u16) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(state, port).await {
            tracing::error!(error = %e, "API server stopped");
        }
    })
}
