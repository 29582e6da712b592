//! Equipment endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        deletion::{CreateDeletionRequest, DeletionRequest},
        equipment::{CreateEquipment, Equipment, EquipmentQuery, StatusSummary, UpdateEquipment},
    },
    AppState,
};

use super::AuthenticatedUser;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteQuery {
    /// Version the client last saw; omitted deletes unconditionally
    pub version: Option<i32>,
}

/// List equipment
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(EquipmentQuery),
    responses(
        (status = 200, description = "Matching equipment", body = Vec<Equipment>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<EquipmentQuery>,
) -> AppResult<Json<Vec<Equipment>>> {
    let rows = state.services.equipment.list(&query).await?;
    Ok(Json(rows))
}

/// Units per status
#[utoipa::path(
    get,
    path = "/equipment/summary",
    tag = "equipment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Units per status", body = StatusSummary)
    )
)]
pub async fn summary(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<StatusSummary>> {
    Ok(Json(state.services.equipment.summary().await?))
}

/// Get one row
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment", body = Equipment),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Equipment>> {
    Ok(Json(state.services.equipment.get_by_id(id).await?))
}

/// Register equipment into stock
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Registered", body = Equipment),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Same name and brand already in stock", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<Equipment>)> {
    let row = state.services.equipment.create(&data, claims.username()).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// Edit descriptive fields
#[utoipa::path(
    put,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Updated", body = Equipment),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Modified by another user", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateEquipment>,
) -> AppResult<Json<Equipment>> {
    let row = state.services.equipment.update(id, &data, claims.username()).await?;
    Ok(Json(row))
}

/// Delete a row (administrators)
#[utoipa::path(
    delete,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID"), DeleteQuery),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse),
        (status = 409, description = "Modified by another user", body = crate::error::ErrorResponse),
        (status = 422, description = "Equipment is rented or dispatched", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state
        .services
        .equipment
        .delete(id, query.version, claims.username())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ask an administrator to delete a row
#[utoipa::path(
    post,
    path = "/equipment/{id}/deletion-requests",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = CreateDeletionRequest,
    responses(
        (status = 201, description = "Request recorded", body = DeletionRequest),
        (status = 409, description = "A request is already pending", body = crate::error::ErrorResponse)
    )
)]
pub async fn request_deletion(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    data: Option<Json<CreateDeletionRequest>>,
) -> AppResult<(StatusCode, Json<DeletionRequest>)> {
    let data = data.map(|Json(d)| d).unwrap_or_default();
    let request = state
        .services
        .equipment
        .request_deletion(id, &data, claims.username())
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Download the inventory as CSV
#[utoipa::path(
    get,
    path = "/equipment/export",
    tag = "equipment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV backup with UTF-8 BOM", content_type = "text/csv")
    )
)]
pub async fn export_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let bytes = state.services.equipment.export_csv().await?;
    let filename = format!("equipment-{}.csv", Local::now().format("%Y%m%d"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}
