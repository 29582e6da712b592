//! CSV import endpoints (administrators)

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::import_report::ImportReport,
    AppState,
};

use super::AuthenticatedUser;

/// Multipart body of the import endpoints
#[derive(ToSchema)]
pub struct CsvUpload {
    /// The CSV file
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Read the `file` part of a multipart upload
async fn read_file(mut multipart: Multipart) -> AppResult<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
            if bytes.is_empty() {
                return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
            }
            return Ok(bytes.to_vec());
        }
    }
    Err(AppError::BadRequest("Missing 'file' field".to_string()))
}

/// Import an equipment CSV backup
#[utoipa::path(
    post,
    path = "/import/equipment",
    tag = "import",
    security(("bearer_auth" = [])),
    request_body(content = CsvUpload, content_type = "multipart/form-data", description = "CSV in a `file` field"),
    responses(
        (status = 200, description = "Import report", body = ImportReport),
        (status = 400, description = "Unreadable CSV", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse)
    )
)]
pub async fn import_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Json<ImportReport>> {
    claims.require_admin()?;
    let bytes = read_file(multipart).await?;
    let report = state
        .services
        .equipment
        .import_csv(&bytes, claims.username())
        .await?;
    Ok(Json(report))
}

/// Import the users sheet
#[utoipa::path(
    post,
    path = "/import/users",
    tag = "import",
    security(("bearer_auth" = [])),
    request_body(content = CsvUpload, content_type = "multipart/form-data", description = "CSV in a `file` field"),
    responses(
        (status = 200, description = "Import report", body = ImportReport),
        (status = 400, description = "Unreadable CSV", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse)
    )
)]
pub async fn import_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Json<ImportReport>> {
    claims.require_admin()?;
    let bytes = read_file(multipart).await?;
    let report = state.services.users.import_csv(&bytes).await?;
    Ok(Json(report))
}
