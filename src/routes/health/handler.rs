use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!("root endpoint hit");
    Json(json!({ "ok": true, "service": "api", "env": state.config.env }))
}

#[axum::debug_handler]
pub async fn db_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.directory.check_store().await {
        Ok(result) => {
            tracing::info!(result, "db-check success");
            (StatusCode::OK, Json(json!({ "db": "ok", "result": result })))
        }
        Err(e) => {
            tracing::error!(error = %e, "db-check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "db": "error", "detail": e.to_string() })),
            )
        }
    }
}
