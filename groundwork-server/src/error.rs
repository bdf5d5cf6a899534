//! Error types for groundwork-server

use groundwork_core::ConfigError;
use thiserror::Error;

use crate::cache::CacheError;
use crate::db::DbError;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid CORS origin '{origin}'")]
    InvalidOrigin { origin: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
