//! Banner and health handlers

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({"message": "Router API is running"}))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session_policy: String,
    pub session_cached: bool,
}

/// GET /health
/// Liveness of the API process; does not contact the router
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let sessions = state.dispatcher().sessions();
    Json(HealthResponse {
        status: "ok",
        session_policy: sessions.policy().to_string(),
        session_cached: sessions.has_cached_session().await,
    })
}
