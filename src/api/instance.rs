//! Instance API handlers

use crate::api::SuccessResponse;
use crate::domain::{CreateInstanceInput, UpdateInstanceInput};
use crate::error::Result;
use crate::middleware::OwnerIdentity;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

/// List the caller's instances
pub async fn list(
    State(state): State<AppState>,
    owner: OwnerIdentity,
) -> Result<impl IntoResponse> {
    let instances = state.instance_service.list_for_owner(owner.user_id).await?;
    Ok(Json(SuccessResponse::new(instances)))
}

/// Create an instance owned by the caller
pub async fn create(
    State(state): State<AppState>,
    owner: OwnerIdentity,
    Json(input): Json<CreateInstanceInput>,
) -> Result<impl IntoResponse> {
    let instance = state.instance_service.create(owner.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(instance))))
}

/// Get one of the caller's instances by hash
pub async fn get(
    State(state): State<AppState>,
    owner: OwnerIdentity,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse> {
    let instance = state
        .instance_service
        .resolve_for_owner(&hash, owner.user_id)
        .await?;
    Ok(Json(SuccessResponse::new(instance)))
}

/// Update an instance
pub async fn update(
    State(state): State<AppState>,
    owner: OwnerIdentity,
    Path(hash): Path<String>,
    Json(input): Json<UpdateInstanceInput>,
) -> Result<impl IntoResponse> {
    let instance = state
        .instance_service
        .update(&hash, owner.user_id, input)
        .await?;
    Ok(Json(SuccessResponse::new(instance)))
}

/// Delete an instance (cascades its respondents)
pub async fn delete(
    State(state): State<AppState>,
    owner: OwnerIdentity,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse> {
    state.instance_service.delete(&hash, owner.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Public status lookup; the only unauthenticated instance read
pub async fn status(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse> {
    let status = state.instance_service.public_status(&hash).await?;
    Ok(Json(SuccessResponse::new(status)))
}
