use axum::extract::State;
use axum::{
    Router,
    routing::get,
};
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    project: String,
}

async fn health(State(state): State<AppState>) -> axum::Json<HealthResponse> {
    info!("GET /health - Health check");
    axum::Json(HealthResponse { status: "OK", project: state.config.project_name.clone() })
}