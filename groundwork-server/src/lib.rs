//! groundwork-server: connection lifecycle, record repository and HTTP surface
//!
//! Hosts one relational pool and one cache pool per process, a generic
//! key-based repository over the relational store, and a small axum router
//! that reports on both.

pub mod cache;
pub mod db;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod state;

pub use cache::{CacheClient, CacheError, CacheManager};
pub use db::{DatabaseManager, DbError, FieldValue, Fields, Record, Repository, Session};
pub use error::{ServerError, ServerResult};
pub use http::{build_router, run_server};
pub use lifecycle::{shutdown, startup, Phase};
pub use state::AppState;
