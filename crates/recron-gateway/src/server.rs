//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use recron_core::Result;
use recron_scheduler::{ExpressionCell, Rescheduler};

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    /// Expression cell backing the externally-configured task. Mutation
    /// endpoints write here and nowhere else.
    pub cell: Arc<ExpressionCell>,
    /// Engine handle, used read-only for snapshots.
    pub engine: Arc<Mutex<Rescheduler>>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/health", get(super::routes::health_check))
        .route("/api/v1/tasks", get(super::routes::list_tasks))
        .route(
            "/api/v1/tasks/expression",
            post(super::routes::update_expression),
        )
        .route("/api/v1/tasks/disable", post(super::routes::disable))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(shared)
}

/// Bind and serve until the process shuts down.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Gateway listening on http://{addr}");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
