//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, deletions, equipment, health, imports, logs, movements, tickets, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gearhouse API",
        version = "0.3.0",
        description = "Equipment rental and dispatch inventory REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::me,
        // Equipment
        equipment::list_equipment,
        equipment::summary,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        equipment::request_deletion,
        equipment::export_equipment,
        // Movements
        movements::rent,
        movements::dispatch,
        movements::return_equipment,
        movements::change_status,
        movements::return_site,
        // Tickets
        tickets::list_sites,
        tickets::create_ticket,
        tickets::list_tickets,
        tickets::delete_tickets,
        // Logs
        logs::list_logs,
        logs::delete_logs,
        // Deletion requests
        deletions::list_deletion_requests,
        deletions::approve,
        deletions::reject,
        // Users
        users::list_users,
        users::update_user,
        users::delete_user,
        // Import
        imports::import_equipment,
        imports::import_users,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::equipment::EquipmentQuery,
            crate::models::equipment::StatusSummary,
            crate::models::equipment::SiteSummary,
            crate::models::status::EquipmentStatus,
            // Movements
            crate::models::movement::RentRequest,
            crate::models::movement::DispatchRequest,
            crate::models::movement::ReturnRequest,
            crate::models::movement::StatusChangeRequest,
            crate::models::movement::MovementOutcome,
            crate::models::movement::SiteReturnOutcome,
            // Tickets
            crate::models::ticket::DispatchTicket,
            crate::models::ticket::TicketRequest,
            crate::models::ticket::DeleteTickets,
            // Logs
            crate::models::log::LogEntry,
            crate::models::log::LogKind,
            crate::models::log::LogQuery,
            crate::models::log::DeleteLogEntries,
            crate::models::log::DeletedCount,
            // Deletion requests
            crate::models::deletion::DeletionRequest,
            crate::models::deletion::RequestStatus,
            crate::models::deletion::CreateDeletionRequest,
            crate::models::deletion::DeletionRequestQuery,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            // Import
            crate::models::import_report::ImportReport,
            crate::api::imports::CsvUpload,
            crate::models::import_report::RowError,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Login and registration"),
        (name = "equipment", description = "Inventory rows"),
        (name = "movements", description = "Rent, dispatch, return and status changes"),
        (name = "tickets", description = "Dispatch sites and tickets"),
        (name = "logs", description = "Activity log"),
        (name = "deletion-requests", description = "Deletion request review"),
        (name = "users", description = "User management"),
        (name = "import", description = "CSV imports")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
