//! API error types with IntoResponse
//!
//! Backend errors become JSON bodies. Unavailable backends map to 503, anything
//! else to a generic 500 with the detail logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::cache::CacheError;
use crate::db::DbError;

#[derive(Debug)]
pub enum ApiError {
    /// Relational store failure
    Database(DbError),

    /// Cache failure
    Cache(CacheError),
}

impl ApiError {
    fn is_unavailable(&self) -> bool {
        match self {
            Self::Database(DbError::NotInitialized { .. }) => true,
            Self::Database(DbError::Sqlx(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)) => {
                true
            }
            Self::Cache(CacheError::NotInitialized | CacheError::Pool(_)) => true,
            _ => false,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = if self.is_unavailable() {
            tracing::warn!(error = ?self, "Backend unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "service_unavailable",
                    "message": "a backing service is not available"
                }),
            )
        } else {
            match &self {
                Self::Database(e) => tracing::error!("Database error: {}", e),
                Self::Cache(e) => tracing::error!("Cache error: {}", e),
            }
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "internal_error",
                    "message": "an internal error occurred"
                }),
            )
        };

        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        Self::Database(e)
    }
}

impl From<CacheError> for ApiError {
    fn from(e: CacheError) -> Self {
        Self::Cache(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn uninitialized_database_is_503() {
        let err = ApiError::from(DbError::NotInitialized { manager: "database" });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "service_unavailable");
    }

    #[tokio::test]
    async fn uninitialized_cache_is_503() {
        let response = ApiError::from(CacheError::NotInitialized).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn other_errors_are_500_without_detail() {
        let err = ApiError::from(DbError::UnknownField {
            table: "widgets",
            field: "colour".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "an internal error occurred");
    }
}
