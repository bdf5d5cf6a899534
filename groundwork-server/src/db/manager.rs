//! Relational connection manager
//!
//! Owns the process-wide `PgPool`. The pool connects lazily, so `init()`
//! performs no network I/O; the first session that runs a statement opens the
//! first connection.

use std::str::FromStr;
use std::time::Duration;

use futures::future::BoxFuture;
use groundwork_core::PostgresSettings;
use parking_lot::RwLock;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use tracing::{info, warn};

use super::{DbError, Session};
use crate::lifecycle::{ManagerState, Phase};

const MANAGER: &str = "database";

/// Lifecycle owner for the relational connection pool.
pub struct DatabaseManager {
    settings: PostgresSettings,
    state: RwLock<ManagerState<PgPool>>,
}

impl DatabaseManager {
    pub fn new(settings: PostgresSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(ManagerState::Uninitialized),
        }
    }

    /// Build the pool. Fails if the manager is already ready.
    ///
    /// Re-initializing after [`DatabaseManager::close`] opens a fresh pool.
    pub fn init(&self) -> Result<(), DbError> {
        let mut state = self.state.write();
        if state.ready().is_some() {
            return Err(DbError::AlreadyInitialized { manager: MANAGER });
        }

        let pool = build_pool(&self.settings)?;
        *state = ManagerState::Ready(pool);

        info!(
            host = %self.settings.host,
            schema = %self.settings.schema,
            max_connections = self.settings.max_connections(),
            "Database pool initialized"
        );
        Ok(())
    }

    /// Close the pool and wait for checked-out connections to be returned.
    ///
    /// Safe to call when not ready.
    pub async fn close(&self) {
        let pool = self.state.write().close();
        if let Some(pool) = pool {
            pool.close().await;
            info!("Database pool closed");
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.read().phase()
    }

    /// Handle to the live pool
    pub fn pool(&self) -> Result<PgPool, DbError> {
        self.state
            .read()
            .ready()
            .cloned()
            .ok_or(DbError::NotInitialized { manager: MANAGER })
    }

    /// Start a new unit of work.
    pub fn acquire_session(&self) -> Result<Session, DbError> {
        Ok(Session::new(self.pool()?))
    }

    /// Run `f` inside a session, rolling back before an error propagates.
    ///
    /// Success does not commit; `f` commits what it wants kept.
    ///
    /// ```ignore
    /// let widget = db
    ///     .with_session(move |session| {
    ///         Box::pin(async move { Repository::<Widget>::new().create(session, fields).await })
    ///     })
    ///     .await?;
    /// ```
    pub async fn with_session<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, E>>,
        E: From<DbError>,
    {
        let mut session = self.acquire_session()?;
        let result = f(&mut session).await;
        if result.is_err() {
            if let Err(err) = session.rollback().await {
                warn!(error = %err, "rollback after failed unit of work also failed");
            }
        }
        result
    }
}

impl std::fmt::Debug for DatabaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Connection options derived from settings: DSN, `search_path`, statement logging.
pub(crate) fn connect_options(settings: &PostgresSettings) -> Result<PgConnectOptions, DbError> {
    let mut options = PgConnectOptions::from_str(&settings.dsn())?
        .options([("search_path", settings.schema.as_str())]);
    if !settings.echo {
        options = options.disable_statement_logging();
    }
    Ok(options)
}

fn build_pool(settings: &PostgresSettings) -> Result<PgPool, DbError> {
    let options = connect_options(settings)?;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections())
        .max_lifetime(Duration::from_secs(settings.pool_recycle))
        .test_before_acquire(true)
        .connect_lazy_with(options);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::Secret;

    fn settings() -> PostgresSettings {
        PostgresSettings {
            password: Secret::from("pg-secret"),
            host: "db.internal".to_owned(),
            schema: "tenant_a".to_owned(),
            ..PostgresSettings::default()
        }
    }

    #[test]
    fn acquire_before_init_fails() {
        let manager = DatabaseManager::new(settings());
        let err = manager.acquire_session().unwrap_err();
        assert!(matches!(err, DbError::NotInitialized { manager: "database" }));
        assert_eq!(manager.phase(), Phase::Uninitialized);
    }

    #[tokio::test]
    async fn with_session_before_init_fails_without_running() {
        let manager = DatabaseManager::new(settings());
        let result: Result<(), DbError> = manager
            .with_session(|_session| Box::pin(async { Ok(()) }))
            .await;
        assert!(matches!(result, Err(DbError::NotInitialized { .. })));
    }

    #[tokio::test]
    async fn init_close_reinit() {
        let manager = DatabaseManager::new(settings());

        manager.init().expect("init");
        assert_eq!(manager.phase(), Phase::Ready);
        let session = manager.acquire_session().expect("session");
        assert!(!session.in_transaction());
        drop(session);

        let err = manager.init().unwrap_err();
        assert!(matches!(err, DbError::AlreadyInitialized { .. }));

        manager.close().await;
        assert_eq!(manager.phase(), Phase::Closed);
        assert!(matches!(
            manager.acquire_session(),
            Err(DbError::NotInitialized { .. })
        ));

        // Second close is a no-op
        manager.close().await;
        assert_eq!(manager.phase(), Phase::Closed);

        manager.init().expect("re-init");
        assert_eq!(manager.phase(), Phase::Ready);
        manager.close().await;
    }

    #[tokio::test]
    async fn close_before_init_is_noop() {
        let manager = DatabaseManager::new(settings());
        manager.close().await;
        assert_eq!(manager.phase(), Phase::Uninitialized);
    }

    #[test]
    fn invalid_dsn_leaves_manager_uninitialized() {
        let manager = DatabaseManager::new(PostgresSettings {
            dsn: Some(Secret::from("::not a url::")),
            ..settings()
        });
        assert!(matches!(manager.init(), Err(DbError::Sqlx(_))));
        assert_eq!(manager.phase(), Phase::Uninitialized);
    }

    #[test]
    fn connect_options_follow_settings() {
        let options = connect_options(&settings()).expect("options");

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_database(), Some("db"));
        assert_eq!(options.get_username(), "admin");
        assert!(options
            .get_options()
            .is_some_and(|opts| opts.contains("search_path=tenant_a")));
    }

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p groundwork-server -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_acquires_connection() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let manager = DatabaseManager::new(PostgresSettings {
            dsn: Some(Secret::new(url)),
            ..settings()
        });
        manager.init().expect("init");

        let result: (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(&manager.pool().unwrap())
            .await
            .expect("query failed");

        assert_eq!(result.0, 1);
        manager.close().await;
    }
}
