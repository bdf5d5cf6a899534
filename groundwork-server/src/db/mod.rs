//! Relational store access - connection manager, sessions and the generic repository
//!
//! # Design Principles
//!
//! - One lazily connecting pool per process, owned by [`DatabaseManager`]
//! - Every unit of work runs in a [`Session`]; dropping it uncommitted rolls back
//! - Mutating repository calls commit their own unit of work
//! - SQL identifiers come only from a record's static column list

pub mod error;
pub mod manager;
pub mod record;
pub mod repo;
pub mod session;

pub use error::DbError;
pub use manager::DatabaseManager;
pub use record::{FieldValue, Fields, Record};
pub use repo::Repository;
pub use session::Session;
