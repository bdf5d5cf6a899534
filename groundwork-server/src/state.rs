//! Application state shared across handlers and lifecycle hooks

use std::sync::Arc;

use groundwork_core::{PasswordService, Settings};

use crate::cache::CacheManager;
use crate::db::DatabaseManager;

/// Shared application state
///
/// Owns one manager per backend. Managers start uninitialized; see
/// [`crate::lifecycle::startup`].
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    settings: Settings,
    database: DatabaseManager,
    cache: CacheManager,
    passwords: PasswordService,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let database = DatabaseManager::new(settings.postgres.clone());
        let cache = CacheManager::new(settings.redis.clone());
        Self {
            inner: Arc::new(AppStateInner {
                settings,
                database,
                cache,
                passwords: PasswordService::new(),
            }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.inner.database
    }

    pub fn cache(&self) -> &CacheManager {
        &self.inner.cache
    }

    pub fn passwords(&self) -> &PasswordService {
        &self.inner.passwords
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("database", &self.inner.database)
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}
