//! Connection manager lifecycle and process startup/shutdown hooks
//!
//! Each manager moves `Uninitialized -> Ready -> Closed`. Startup initializes
//! the relational manager before the cache manager; shutdown closes them in
//! the same order. A failure in one does not undo the other.

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::error::ServerError;
use crate::state::AppState;

/// Observable lifecycle phase of a connection manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Uninitialized,
    Ready,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Holds at most one live handle, tagged with its lifecycle phase
#[derive(Debug)]
pub enum ManagerState<T> {
    Uninitialized,
    Ready(T),
    Closed,
}

impl<T> Default for ManagerState<T> {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl<T> ManagerState<T> {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Uninitialized => Phase::Uninitialized,
            Self::Ready(_) => Phase::Ready,
            Self::Closed => Phase::Closed,
        }
    }

    /// The live handle, if the manager is ready
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(handle) => Some(handle),
            _ => None,
        }
    }

    /// Take the live handle and move to `Closed`.
    ///
    /// A manager that was never ready keeps its phase and yields nothing.
    pub fn close(&mut self) -> Option<T> {
        match std::mem::replace(self, Self::Closed) {
            Self::Ready(handle) => Some(handle),
            previous => {
                *self = previous;
                None
            }
        }
    }
}

/// Initialize connection managers: relational first, then cache.
pub fn startup(state: &AppState) -> Result<(), ServerError> {
    state.database().init()?;
    state.cache().init()?;
    info!("Connection managers ready");
    Ok(())
}

/// Close connection managers in startup order, waiting for release.
pub async fn shutdown(state: &AppState) {
    state.database().close().await;
    state.cache().close();
    info!("Connection managers closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::Settings;

    fn settings() -> Settings {
        Settings::from_vars([
            ("POSTGRES__PASSWORD", "pg-secret"),
            ("JWT__SECRET_KEY", "signing-secret"),
        ])
        .expect("settings")
    }

    #[test]
    fn close_ready_state_yields_handle() {
        let mut state = ManagerState::Ready(7);
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(state.ready(), Some(&7));

        assert_eq!(state.close(), Some(7));
        assert_eq!(state.phase(), Phase::Closed);
        assert_eq!(state.close(), None);
        assert_eq!(state.phase(), Phase::Closed);
    }

    #[test]
    fn close_uninitialized_is_noop() {
        let mut state: ManagerState<u8> = ManagerState::default();
        assert_eq!(state.close(), None);
        assert_eq!(state.phase(), Phase::Uninitialized);
    }

    #[test]
    fn phase_serializes_lowercase() {
        let json = serde_json::to_string(&Phase::Uninitialized).unwrap();
        assert_eq!(json, "\"uninitialized\"");
        assert_eq!(Phase::Ready.to_string(), "ready");
    }

    #[tokio::test]
    async fn startup_then_shutdown_walks_both_managers() {
        let state = AppState::new(settings());
        assert_eq!(state.database().phase(), Phase::Uninitialized);
        assert_eq!(state.cache().phase(), Phase::Uninitialized);

        startup(&state).expect("startup");
        assert_eq!(state.database().phase(), Phase::Ready);
        assert_eq!(state.cache().phase(), Phase::Ready);

        shutdown(&state).await;
        assert_eq!(state.database().phase(), Phase::Closed);
        assert_eq!(state.cache().phase(), Phase::Closed);
    }

    #[tokio::test]
    async fn cache_failure_leaves_database_ready() {
        let settings = Settings::from_vars([
            ("POSTGRES__PASSWORD", "pg-secret"),
            ("JWT__SECRET_KEY", "signing-secret"),
            ("REDIS__DSN", "not a redis url"),
        ])
        .expect("settings");
        let state = AppState::new(settings);

        assert!(startup(&state).is_err());
        assert_eq!(state.database().phase(), Phase::Ready);
        assert_eq!(state.cache().phase(), Phase::Uninitialized);

        shutdown(&state).await;
    }
}
