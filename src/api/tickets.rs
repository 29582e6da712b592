//! Dispatch sites and ticket endpoints

use axum::{
    extract::State,
    http::{header, HeaderName},
    response::IntoResponse,
    Json,
};
use chrono::Local;

use crate::{
    error::AppResult,
    models::{
        equipment::SiteSummary,
        log::DeletedCount,
        ticket::{DeleteTickets, DispatchTicket, TicketRequest},
    },
    AppState,
};

use super::AuthenticatedUser;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
static TICKET_ID_HEADER: HeaderName = HeaderName::from_static("x-ticket-id");

/// Sites that currently hold dispatched equipment
#[utoipa::path(
    get,
    path = "/sites",
    tag = "tickets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dispatch sites", body = Vec<SiteSummary>)
    )
)]
pub async fn list_sites(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<SiteSummary>>> {
    Ok(Json(state.services.equipment.sites().await?))
}

/// Generate a dispatch ticket workbook
#[utoipa::path(
    post,
    path = "/tickets",
    tag = "tickets",
    security(("bearer_auth" = [])),
    request_body = TicketRequest,
    responses(
        (status = 200, description = "XLSX workbook, one sheet per site", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 404, description = "No selected site has dispatched equipment", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<TicketRequest>,
) -> AppResult<impl IntoResponse> {
    let (ticket, workbook) = state
        .services
        .tickets
        .generate(&data, claims.username())
        .await?;

    let filename = format!("dispatch-ticket-{}.xlsx", Local::now().format("%Y%m%d-%H%M"));

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
            (TICKET_ID_HEADER.clone(), ticket.id.to_string()),
        ],
        workbook.bytes,
    ))
}

/// Ticket history, newest first
#[utoipa::path(
    get,
    path = "/tickets",
    tag = "tickets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Generated tickets", body = Vec<DispatchTicket>)
    )
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<DispatchTicket>>> {
    Ok(Json(state.services.tickets.list().await?))
}

/// Remove ticket history rows (administrators)
#[utoipa::path(
    delete,
    path = "/tickets",
    tag = "tickets",
    security(("bearer_auth" = [])),
    request_body = DeleteTickets,
    responses(
        (status = 200, description = "Rows removed", body = DeletedCount),
        (status = 403, description = "Administrators only", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_tickets(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<DeleteTickets>,
) -> AppResult<Json<DeletedCount>> {
    claims.require_admin()?;
    let deleted = state
        .services
        .tickets
        .delete_many(&data.ids, claims.username())
        .await?;
    Ok(Json(DeletedCount { deleted }))
}
