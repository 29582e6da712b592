//! Rent, dispatch, return and status change endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::movement::{
        DispatchRequest, MovementOutcome, RentRequest, ReturnRequest, SiteReturnOutcome,
        StatusChangeRequest,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Rent units to an external company
#[utoipa::path(
    post,
    path = "/equipment/{id}/rent",
    tag = "movements",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = RentRequest,
    responses(
        (status = 200, description = "Units rented", body = MovementOutcome),
        (status = 409, description = "Modified by another user", body = crate::error::ErrorResponse),
        (status = 422, description = "Not in stock or quantity out of range", body = crate::error::ErrorResponse)
    )
)]
pub async fn rent(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<RentRequest>,
) -> AppResult<Json<MovementOutcome>> {
    let outcome = state.services.movements.rent(id, &data, claims.username()).await?;
    Ok(Json(outcome))
}

/// Dispatch units to a job site
#[utoipa::path(
    post,
    path = "/equipment/{id}/dispatch",
    tag = "movements",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = DispatchRequest,
    responses(
        (status = 200, description = "Units dispatched", body = MovementOutcome),
        (status = 409, description = "Modified by another user", body = crate::error::ErrorResponse),
        (status = 422, description = "Not in stock or quantity out of range", body = crate::error::ErrorResponse)
    )
)]
pub async fn dispatch(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<DispatchRequest>,
) -> AppResult<Json<MovementOutcome>> {
    let outcome = state.services.movements.dispatch(id, &data, claims.username()).await?;
    Ok(Json(outcome))
}

/// Return rented or dispatched units to stock
#[utoipa::path(
    post,
    path = "/equipment/{id}/return",
    tag = "movements",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Units back in stock", body = MovementOutcome),
        (status = 409, description = "Modified by another user", body = crate::error::ErrorResponse),
        (status = 422, description = "Not out", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<ReturnRequest>,
) -> AppResult<Json<MovementOutcome>> {
    let outcome = state
        .services
        .movements
        .return_units(id, &data, claims.username())
        .await?;
    Ok(Json(outcome))
}

/// Move units between stock, repair and damaged
#[utoipa::path(
    post,
    path = "/equipment/{id}/status",
    tag = "movements",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "Status changed", body = MovementOutcome),
        (status = 409, description = "Modified by another user", body = crate::error::ErrorResponse),
        (status = 422, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn change_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<StatusChangeRequest>,
) -> AppResult<Json<MovementOutcome>> {
    let outcome = state
        .services
        .movements
        .change_status(id, &data, claims.username())
        .await?;
    Ok(Json(outcome))
}

/// Return everything out with a borrower or site
#[utoipa::path(
    post,
    path = "/sites/{site}/return",
    tag = "movements",
    security(("bearer_auth" = [])),
    params(("site" = String, Path, description = "Borrower or site name")),
    responses(
        (status = 200, description = "Everything returned", body = SiteReturnOutcome),
        (status = 404, description = "Nothing is out there", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_site(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(site): Path<String>,
) -> AppResult<Json<SiteReturnOutcome>> {
    let outcome = state
        .services
        .movements
        .return_site(&site, claims.username())
        .await?;
    Ok(Json(outcome))
}
