//! Dispatch ticket history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Metadata of a generated dispatch ticket; the workbook itself is not kept
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DispatchTicket {
    pub id: Uuid,
    /// Site names joined by ", "
    pub site_names: String,
    pub writer: String,
    pub created_at: DateTime<Utc>,
}

/// Generate a ticket covering one sheet per site
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TicketRequest {
    #[validate(length(min = 1, message = "Select at least one site"))]
    pub sites: Vec<String>,
}

/// Ticket history rows to remove
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteTickets {
    pub ids: Vec<Uuid>,
}
