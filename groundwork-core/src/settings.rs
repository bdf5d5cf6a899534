//! Process settings assembled from the environment
//!
//! Sources, lowest to highest precedence:
//! - built-in defaults
//! - a `.env` file (see [`load_dotenv`]); never overwrites variables already set
//! - process environment variables
//!
//! Nested groups use a double underscore, e.g. `POSTGRES__POOL_SIZE` maps to
//! `postgres.pool_size`. Keys are case-insensitive.
//!
//! Required secrets (`POSTGRES__PASSWORD`, `JWT__SECRET_KEY`) must be present
//! and non-empty, otherwise loading fails before anything connects.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use chrono::Duration;
use config::{Config, Environment};
use serde::Deserialize;
use tracing::{debug, info};
use urlencoding::encode;

use crate::error::{ConfigError, ConfigResult};

const NESTED_SEPARATOR: &str = "__";
const LIST_SEPARATOR: &str = ",";

/// Load a `.env` file into the process environment.
///
/// With an explicit path the file must exist. Without one, `.env` in the
/// current directory (or a parent) is used when present.
///
/// Returns the path that was loaded, if any.
pub fn load_dotenv(explicit: Option<&Path>) -> ConfigResult<Option<PathBuf>> {
    if let Some(path) = explicit {
        dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded environment from {}", path.display());
        return Ok(Some(path.to_path_buf()));
    }

    match dotenvy::dotenv() {
        Ok(path) => {
            info!("Loaded environment from {}", path.display());
            Ok(Some(path))
        }
        Err(err) if err.not_found() => {
            debug!("No .env file found, using process environment only");
            Ok(None)
        }
        Err(source) => Err(ConfigError::EnvFile {
            path: PathBuf::from(".env"),
            source,
        }),
    }
}

/// A string value that never shows up in `Debug` output
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Immutable snapshot of process configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bind address for the HTTP listener (IP literal)
    pub host: String,
    pub port: u16,
    /// Origins allowed to make cross-origin requests
    #[serde(deserialize_with = "comma_separated")]
    pub cors_origins: Vec<String>,

    pub postgres: PostgresSettings,
    pub redis: RedisSettings,
    pub mongo: MongoSettings,
    pub kafka: KafkaSettings,
    pub jwt: JwtSettings,
}

/// Relational store connection and pool sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresSettings {
    pub user: String,
    pub password: Secret,
    pub host: String,
    pub port: u16,
    pub db: String,
    /// Applied as `search_path` on every pooled connection
    pub schema: String,

    /// Connections kept in the pool
    pub pool_size: u32,
    /// Extra connections allowed under load
    pub max_overflow: u32,
    /// Seconds before a connection is recycled
    pub pool_recycle: u64,
    /// Log every executed statement
    pub echo: bool,

    /// Full connection string; composed from the fields above when unset
    pub dsn: Option<Secret>,
}

/// Key-value cache connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub db: u32,
    pub password: Option<Secret>,
    pub max_connections: usize,
    pub dsn: Option<Secret>,
}

/// Document store connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MongoSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Optional; unauthenticated deployments leave it unset
    pub password: Option<Secret>,
    pub db: String,
    pub dsn: Option<Secret>,
}

/// Message bus connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaSettings {
    pub dsn: String,
}

/// Token signing parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtSettings {
    pub secret_key: Secret,
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
}

/// Split a comma-joined value into a list; an actual list passes through.
fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Items {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Items::deserialize(deserializer)? {
        Items::List(items) => items,
        Items::Joined(joined) => joined
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect(),
    })
}

impl Settings {
    /// Load settings from the process environment and validate them.
    pub fn load() -> ConfigResult<Self> {
        Self::from_environment(Self::environment())
    }

    /// Load settings from an explicit set of variables, ignoring the process
    /// environment.
    pub fn from_vars<I, K, V>(vars: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let source: config::Map<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_lowercase(), value.into()))
            .collect();

        Self::from_environment(Self::environment().source(Some(source)))
    }

    // Values stay text until a field asks for a number or bool; a secret such
    // as `007` must keep its exact spelling.
    fn environment() -> Environment {
        Environment::default()
            .separator(NESTED_SEPARATOR)
    }

    fn from_environment(environment: Environment) -> ConfigResult<Self> {
        let settings: Settings = Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!(
            postgres_host = %settings.postgres.host,
            redis_host = %settings.redis.host,
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Check required secrets and value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.postgres.password.is_empty() {
            return Err(ConfigError::missing_secret("postgres.password"));
        }
        if self.jwt.secret_key.is_empty() {
            return Err(ConfigError::missing_secret("jwt.secret_key"));
        }
        if self.postgres.pool_size == 0 {
            return Err(ConfigError::invalid(
                "postgres.pool_size",
                "must be greater than zero",
            ));
        }
        if self.redis.max_connections == 0 {
            return Err(ConfigError::invalid(
                "redis.max_connections",
                "must be greater than zero",
            ));
        }
        self.bind_addr()?;
        Ok(())
    }

    /// Socket address the HTTP listener binds to
    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::invalid("host", format!("'{}' is not an IP address", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl PostgresSettings {
    /// Connection string, explicit or composed from the individual fields
    pub fn dsn(&self) -> String {
        if let Some(dsn) = &self.dsn {
            return dsn.expose().to_owned();
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            encode(&self.user),
            encode(self.password.expose()),
            self.host,
            self.port,
            self.db
        )
    }

    /// Upper bound on open connections (pool plus overflow)
    pub fn max_connections(&self) -> u32 {
        self.pool_size.saturating_add(self.max_overflow)
    }
}

impl RedisSettings {
    pub fn dsn(&self) -> String {
        if let Some(dsn) = &self.dsn {
            return dsn.expose().to_owned();
        }
        let auth = match &self.password {
            Some(password) if !password.is_empty() => format!(":{}@", encode(password.expose())),
            _ => String::new(),
        };
        format!("redis://{}{}:{}/{}", auth, self.host, self.port, self.db)
    }
}

impl MongoSettings {
    pub fn dsn(&self) -> String {
        if let Some(dsn) = &self.dsn {
            return dsn.expose().to_owned();
        }
        let credentials = match &self.password {
            Some(password) if !password.is_empty() => {
                format!("{}:{}", encode(&self.user), encode(password.expose()))
            }
            _ => encode(&self.user).into_owned(),
        };
        format!(
            "mongodb://{}@{}:{}/{}",
            credentials, self.host, self.port, self.db
        )
    }
}

impl JwtSettings {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expire_minutes)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_expire_days)
    }
}

// --- Default ---

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            cors_origins: Vec::new(),
            postgres: PostgresSettings::default(),
            redis: RedisSettings::default(),
            mongo: MongoSettings::default(),
            kafka: KafkaSettings::default(),
            jwt: JwtSettings::default(),
        }
    }
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            user: "admin".to_owned(),
            password: Secret::default(),
            host: "postgres".to_owned(),
            port: 5432,
            db: "db".to_owned(),
            schema: "public".to_owned(),
            pool_size: 10,
            max_overflow: 20,
            pool_recycle: 3600,
            echo: false,
            dsn: None,
        }
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "redis".to_owned(),
            port: 6379,
            db: 0,
            password: None,
            max_connections: 10,
            dsn: None,
        }
    }
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            host: "mongo".to_owned(),
            port: 27017,
            user: "admin".to_owned(),
            password: None,
            db: "db".to_owned(),
            dsn: None,
        }
    }
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            dsn: "kafka://kafka:9092".to_owned(),
        }
    }
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret_key: Secret::default(),
            algorithm: "HS256".to_owned(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
        }
    }
}
