use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde_json::json;

use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and storage are reachable"),
        (status = 500, description = "Storage unreachable")
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, WebError> {
    state.store().ping().await?;

    Ok(Json(json!({ "status": "ok" })))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
