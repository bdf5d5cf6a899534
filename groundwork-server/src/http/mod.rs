//! HTTP server layer
//!
//! Axum server with:
//! - CORS restricted to the configured origin allow-list
//! - Request tracing
//! - Graceful shutdown wrapped by the connection lifecycle hooks
//! - JSON error responses

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, cors_layer, run_server};
