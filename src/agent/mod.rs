// ABOUTME: HTTP agent running on each host next to the container engine.
// ABOUTME: Serves deploy, status and health endpoints over the local engine.

mod args;
mod client;
mod deploy;
mod error;
mod health;
mod status;

pub use args::AgentArgs;
pub use client::{AgentClient, AgentError};
pub use deploy::DeployResponse;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use health::HealthResponse;

use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::deploy::DeploySettings;
use crate::runtime::Engine;

/// Port the agent listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 3030;

/// Shared state of the agent's handlers.
pub struct AgentState {
    pub engine: Arc<dyn Engine>,
    pub settings: DeploySettings,
    /// Cancelled when the agent shuts down; aborts a pending proxy wait.
    pub shutdown: CancellationToken,
    /// Held for the duration of a deployment run.
    deploying: Arc<Mutex<()>>,
}

impl AgentState {
    pub fn new(
        engine: Arc<dyn Engine>,
        settings: DeploySettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            settings,
            shutdown,
            deploying: Arc::new(Mutex::new(())),
        }
    }
}

/// All agent routes.
pub fn router(state: Arc<AgentState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(deploy::router())
        .merge(status::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the agent on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AgentState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "agent listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
