//! Activity log endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::log::{DeleteLogEntries, DeletedCount, LogEntry, LogQuery},
    AppState,
};

use super::AuthenticatedUser;

/// Activity log, newest first
#[utoipa::path(
    get,
    path = "/logs",
    tag = "logs",
    security(("bearer_auth" = [])),
    params(LogQuery),
    responses(
        (status = 200, description = "Log entries", body = Vec<LogEntry>)
    )
)]
pub async fn list_logs(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<LogQuery>,
) -> AppResult<Json<Vec<LogEntry>>> {
    Ok(Json(state.services.logs.list(&query).await?))
}

/// Delete log entries (administrators)
#[utoipa::path(
    delete,
    path = "/logs",
    tag = "logs",
    security(("bearer_auth" = [])),
    request_body = DeleteLogEntries,
    responses(
        (status = 200, description = "Entries removed", body = DeletedCount),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_logs(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<DeleteLogEntries>,
) -> AppResult<Json<DeletedCount>> {
    claims.require_admin()?;
    let deleted = state
        .services
        .logs
        .delete_many(&data.ids, claims.username())
        .await?;
    Ok(Json(DeletedCount { deleted }))
}
