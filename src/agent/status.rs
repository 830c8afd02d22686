// ABOUTME: Status endpoint of the agent.
// ABOUTME: Reports the service container by image name or by container name.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use super::AgentState;
use super::error::ApiResult;
use crate::deploy::{ServiceStatus, named_service_status, service_status};

#[derive(Debug, Deserialize)]
struct StatusQuery {
    image_name: Option<String>,
}

pub fn router() -> Router<Arc<AgentState>> {
    Router::new().route("/api/v1/status", get(get_status))
}

async fn get_status(
    State(state): State<Arc<AgentState>>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<ServiceStatus>> {
    let engine = state.engine.as_ref();
    let status = match query.image_name.as_deref().map(str::trim) {
        Some(image_name) if !image_name.is_empty() => service_status(engine, image_name).await?,
        _ => named_service_status(engine, &state.settings.service_container).await?,
    };
    Ok(Json(status))
}
