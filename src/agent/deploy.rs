// ABOUTME: Deploy endpoint of the agent.
// ABOUTME: Runs one deployment at a time against the local engine.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AgentState;
use super::error::{ApiError, ApiResult};
use crate::deploy::{DeployRequest, deploy};

/// Reply to a successful `POST /deploy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResponse {
    pub status: String,
    pub tag: String,
    pub container_id: String,
}

pub fn router() -> Router<Arc<AgentState>> {
    Router::new().route("/deploy", post(deploy_service))
}

/// The run happens in its own task: a client that hangs up does not abort
/// it halfway between two engine calls.
async fn deploy_service(
    State(state): State<Arc<AgentState>>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> ApiResult<Json<DeployResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let guard = Arc::clone(&state.deploying)
        .try_lock_owned()
        .map_err(|_| ApiError::Conflict("a deployment is already running".to_string()))?;

    tracing::info!(image = %request.image_name, tag = %request.tag, "deploy requested");
    let tag = request.tag.clone();
    let run = tokio::spawn(async move {
        let _guard = guard;
        deploy(
            state.engine.as_ref(),
            &state.settings,
            &request,
            &state.shutdown,
        )
        .await
    });

    let container = run
        .await
        .map_err(|e| ApiError::Internal(format!("deployment task failed: {e}")))??;

    Ok(Json(DeployResponse {
        status: "deployed".to_string(),
        tag,
        container_id: container.to_string(),
    }))
}
