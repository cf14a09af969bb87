//! API route handlers for the gateway.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use recron_scheduler::{SUSPEND_EXPRESSION, cron::CronSchedule};

use super::server::AppState;

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "recron-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// List registered tasks with their trigger state.
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let engine = state.engine.lock().await;
    Json(serde_json::json!({
        "count": engine.task_count(),
        "tasks": engine.snapshots(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateExpression {
    pub expression: String,
}

/// Set the configured task's cron expression.
/// Writes only the shared cell; the rescheduling loop picks the change
/// up on its next tick, so reaction latency is bounded by the tick
/// interval.
pub async fn update_expression(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateExpression>,
) -> (StatusCode, Json<serde_json::Value>) {
    // Reject garbage early; the sentinel is the one non-cadence allowed.
    if body.expression != SUSPEND_EXPRESSION
        && let Err(e) = CronSchedule::parse(&body.expression)
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"ok": false, "error": e.to_string()})),
        );
    }

    state.cell.set(body.expression.clone());
    tracing::info!("✏️ Expression updated via gateway: '{}'", body.expression);
    (
        StatusCode::OK,
        Json(serde_json::json!({"ok": true, "expression": body.expression})),
    )
}

/// Suspend the configured task — sugar for setting the sentinel.
pub async fn disable(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.cell.suspend();
    tracing::info!("⏸️ Task disabled via gateway");
    Json(serde_json::json!({"ok": true, "expression": SUSPEND_EXPRESSION}))
}
