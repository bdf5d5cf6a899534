//! Structured error types for groundwork-core.
//!
//! Library consumers get `thiserror` enums they can match on; the
//! `groundwork` binary wraps them in `anyhow` with context.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling or validating [`crate::Settings`]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The `config` crate could not build or deserialize the sources
    #[error("failed to load settings: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    /// An explicitly requested `.env` file could not be read
    #[error("failed to read env file {path:?}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },

    /// A required secret was absent or empty
    #[error("missing required secret '{field}'")]
    MissingSecret { field: &'static str },

    /// A value was present but unusable
    #[error("invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type alias for settings operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Create a missing secret error
    pub fn missing_secret(field: &'static str) -> Self {
        Self::MissingSecret { field }
    }

    /// Create an invalid value error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors raised while producing a password digest.
///
/// Verification never surfaces an error; see [`crate::PasswordService::verify_password`].
#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("failed to hash password: {0}")]
    Hash(String),
}

impl From<argon2::password_hash::Error> for SecurityError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Hash(err.to_string())
    }
}
