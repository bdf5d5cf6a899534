//! groundwork-core: settings, password hashing and shared error types
//!
//! Everything here is backend-agnostic; connection management lives in
//! `groundwork-server`.

pub mod error;
pub mod security;
pub mod settings;

pub use error::{ConfigError, ConfigResult, SecurityError};
pub use security::PasswordService;
pub use settings::{
    load_dotenv, JwtSettings, KafkaSettings, MongoSettings, PostgresSettings, RedisSettings,
    Secret, Settings,
};
