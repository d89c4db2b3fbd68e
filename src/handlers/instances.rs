//! Fleet instance handlers

use axum::{extract::{State, Path, Query}, Json};
use serde::Deserialize;
use validator::Validate;

use crate::{AppState, AppError, AppResult};
use crate::models::{
    AckResponse, FleetStats, InstanceStatus, ManagedInstance,
    RegisterInstanceRequest, RegisterInstanceResponse, RemoveResponse,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<InstanceStatus>,
    pub limit: Option<usize>,
}

/// Register (or re-register) an extension instance
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterInstanceRequest>,
) -> AppResult<Json<RegisterInstanceResponse>> {
    req.validate()?;

    let instance = state.registry.register(req)?;

    Ok(Json(RegisterInstanceResponse {
        instance,
        server_time: state.registry.now().timestamp(),
    }))
}

/// Instance heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<AckResponse> {
    let accepted = state.registry.heartbeat(&id);

    Json(AckResponse {
        accepted,
        server_time: state.registry.now().timestamp(),
    })
}

/// Operator-driven stale mark
pub async fn mark_stale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<AckResponse> {
    let accepted = state.registry.mark_stale(&id);

    Json(AckResponse {
        accepted,
        server_time: state.registry.now().timestamp(),
    })
}

/// Deregister instance
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<RemoveResponse> {
    Json(RemoveResponse {
        removed: state.registry.remove(&id),
    })
}

/// List instances, optionally filtered by status
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<ManagedInstance>> {
    let instances = state
        .registry
        .get_all()
        .into_iter()
        .filter(|i| query.status.map_or(true, |s| i.status == s))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();

    Json(instances)
}

/// Get single instance
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ManagedInstance>> {
    let instance = state
        .registry
        .get_instance(&id)
        .ok_or_else(|| AppError::NotFound("Instance not found".to_string()))?;

    Ok(Json(instance))
}

/// Fleet health counts
pub async fn stats(State(state): State<AppState>) -> Json<FleetStats> {
    Json(state.registry.stats())
}
