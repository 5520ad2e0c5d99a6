//! Hub server setup
//!
//! Routes, state construction and the server lifecycle.

mod auth;
mod error;
mod handler;
mod middleware;
mod state;

pub use auth::AuthUser;
pub use error::{ApiError, ApiResult, ErrorBody};
pub use handler::{
    health_check, hub_stats, publish_event, root, ws_handler, HealthResponse, HubStatsResponse,
    PublishAccepted, PublishRequest, WsParams,
};
pub use middleware::{apply_middleware, REQUEST_ID_HEADER};
pub use state::AppState;

use crate::hub::Hub;
use crate::identity::JwtIdentityProvider;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use trackit_common::{AppConfig, AppError, JwtService};

/// Time allowed for the hub to close every connection on shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Create the hub router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        .route("/ws/stats", get(hub_stats))
        .route("/api/events", post(publish_event))
}

/// Build the complete application
pub fn create_app(state: AppState) -> Router {
    let router = apply_middleware(create_router(), &state.config().cors);
    router.with_state(state)
}

/// Start the hub and build the state around it
///
/// Returns the hub loop's task handle alongside the state.
pub fn create_app_state(config: AppConfig) -> (AppState, JoinHandle<()>) {
    let (hub, hub_task) = Hub::spawn(config.hub.broadcast_intake_capacity);

    let jwt = JwtService::new(&config.jwt.secret, config.jwt.token_expiry);
    let identity = Arc::new(JwtIdentityProvider::new(jwt));

    (AppState::new(hub, identity, config), hub_task)
}

/// Serve on an already bound listener until `shutdown` resolves
///
/// After the listener stops, the hub is shut down, which closes every live
/// connection's mailbox.
pub async fn serve<F>(listener: TcpListener, config: AppConfig, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (state, hub_task) = create_app_state(config);
    let hub = state.hub().clone();
    let app = create_app(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("server error")))?;

    tracing::info!(live = hub.connection_count(), "Closing live connections");
    hub.shutdown();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, hub_task).await {
        Ok(Ok(())) => tracing::info!("Hub stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Hub task failed"),
        Err(_) => tracing::warn!("Hub did not stop within {:?}", SHUTDOWN_TIMEOUT),
    }

    Ok(())
}

/// Run the complete hub server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.server.address();

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Hub listening on ws://{}/ws", addr);

    serve(listener, config, shutdown_signal()).await
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
