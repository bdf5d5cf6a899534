//! Health check endpoints
//!
//! `/health` reports manager phases without touching a backend.
//! `/health/ready` round-trips a statement and a PING.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::http::ApiError;
use crate::lifecycle::Phase;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: Phase,
    pub cache: Phase,
}

/// Readiness response
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
}

/// GET /health
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.database().phase();
    let cache = state.cache().phase();
    let ready = database == Phase::Ready && cache == Phase::Ready;

    let (status, label) = if ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            version: env!("CARGO_PKG_VERSION"),
            database,
            cache,
        }),
    )
}

/// GET /health/ready
async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, ApiError> {
    let pool = state.database().pool()?;
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(crate::db::DbError::from)?;

    state.cache().client()?.ping().await?;

    Ok(Json(ReadyResponse { status: "ready" }))
}

/// Health routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
}
