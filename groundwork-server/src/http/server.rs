//! Axum server setup
//!
//! Startup hooks run before the listener accepts connections; shutdown hooks
//! run after the server drains, including when serving fails.

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::error::{ServerError, ServerResult};
use crate::lifecycle;
use crate::state::AppState;

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> ServerResult<Router> {
    let cors = cors_layer(&state.settings().cors_origins)?;

    Ok(Router::new()
        .merge(routes::health::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// CORS for an explicit origin allow-list, credentials allowed.
///
/// Methods and headers mirror the preflight request. A wildcard origin is
/// rejected because browsers refuse it alongside credentials.
pub fn cors_layer(origins: &[String]) -> ServerResult<CorsLayer> {
    let origins = origins
        .iter()
        .filter(|origin| !origin.trim().is_empty())
        .map(|origin| {
            if origin.trim() == "*" {
                return Err(ServerError::InvalidOrigin {
                    origin: origin.clone(),
                });
            }
            HeaderValue::from_str(origin.trim()).map_err(|_| ServerError::InvalidOrigin {
                origin: origin.clone(),
            })
        })
        .collect::<ServerResult<Vec<_>>>()?;

    if origins.is_empty() {
        tracing::warn!("CORS: no origins configured, cross-origin requests will be refused");
    }

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Run the HTTP server for the lifetime of the process.
///
/// # Example
///
/// ```ignore
/// let settings = Settings::load()?;
/// run_server(AppState::new(settings)).await?;
/// ```
pub async fn run_server(state: AppState) -> ServerResult<()> {
    let addr = state.settings().bind_addr()?;
    let app = build_router(state.clone())?;

    if let Err(err) = lifecycle::startup(&state) {
        lifecycle::shutdown(&state).await;
        return Err(err);
    }

    let served = serve(app, addr).await;
    lifecycle::shutdown(&state).await;
    served
}

async fn serve(app: Router, addr: std::net::SocketAddr) -> ServerResult<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}
