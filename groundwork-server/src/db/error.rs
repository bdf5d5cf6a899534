//! Database error type

/// Errors raised by the relational manager, sessions and repositories
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("{manager} manager is not initialized; call init() first")]
    NotInitialized { manager: &'static str },

    #[error("{manager} manager is already initialized")]
    AlreadyInitialized { manager: &'static str },

    #[error("unknown field '{field}' for table '{table}'")]
    UnknownField { table: &'static str, field: String },

    #[error("invalid field set: {reason}")]
    InvalidFields { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_initialized_names_the_manager() {
        let err = DbError::NotInitialized {
            manager: "database",
        };
        assert_eq!(
            err.to_string(),
            "database manager is not initialized; call init() first"
        );
    }
}
