//! Deletion request review (administrators)

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::deletion::{DeletionRequest, DeletionRequestQuery},
    AppState,
};

use super::AuthenticatedUser;

/// List deletion requests
#[utoipa::path(
    get,
    path = "/deletion-requests",
    tag = "deletion-requests",
    security(("bearer_auth" = [])),
    params(DeletionRequestQuery),
    responses(
        (status = 200, description = "Deletion requests", body = Vec<DeletionRequest>),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_deletion_requests(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<DeletionRequestQuery>,
) -> AppResult<Json<Vec<DeletionRequest>>> {
    claims.require_admin()?;
    Ok(Json(state.services.equipment.deletion_requests(query.status).await?))
}

/// Approve a request, deleting the equipment
#[utoipa::path(
    post,
    path = "/deletion-requests/{id}/approve",
    tag = "deletion-requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Approved", body = DeletionRequest),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Already resolved, or equipment is out", body = crate::error::ErrorResponse)
    )
)]
pub async fn approve(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<DeletionRequest>> {
    claims.require_admin()?;
    let request = state
        .services
        .equipment
        .resolve_deletion(id, true, claims.username())
        .await?;
    Ok(Json(request))
}

/// Reject a request
#[utoipa::path(
    post,
    path = "/deletion-requests/{id}/reject",
    tag = "deletion-requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Rejected", body = DeletionRequest),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Already resolved", body = crate::error::ErrorResponse)
    )
)]
pub async fn reject(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<DeletionRequest>> {
    claims.require_admin()?;
    let request = state
        .services
        .equipment
        .resolve_deletion(id, false, claims.username())
        .await?;
    Ok(Json(request))
}
