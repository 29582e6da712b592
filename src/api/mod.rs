//! API handlers for Gearhouse REST endpoints

pub mod auth;
pub mod deletions;
pub mod equipment;
pub mod health;
pub mod imports;
pub mod logs;
pub mod movements;
pub mod openapi;
pub mod tickets;
pub mod users;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::request::Parts,
    routing::{delete, get, post},
    RequestPartsExt, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Largest CSV accepted by the import endpoints
const UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Missing or malformed bearer token".to_string()))?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let imports = Router::new()
        .route("/import/equipment", post(imports::import_equipment))
        .route("/import/users", post(imports::import_users))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT));

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/me", get(auth::me))
        // Equipment
        .route("/equipment", get(equipment::list_equipment).post(equipment::create_equipment))
        .route("/equipment/summary", get(equipment::summary))
        .route("/equipment/export", get(equipment::export_equipment))
        .route(
            "/equipment/:id",
            get(equipment::get_equipment)
                .put(equipment::update_equipment)
                .delete(equipment::delete_equipment),
        )
        .route("/equipment/:id/deletion-requests", post(equipment::request_deletion))
        // Movements
        .route("/equipment/:id/rent", post(movements::rent))
        .route("/equipment/:id/dispatch", post(movements::dispatch))
        .route("/equipment/:id/return", post(movements::return_equipment))
        .route("/equipment/:id/status", post(movements::change_status))
        .route("/sites", get(tickets::list_sites))
        .route("/sites/:site/return", post(movements::return_site))
        // Dispatch tickets
        .route(
            "/tickets",
            get(tickets::list_tickets)
                .post(tickets::create_ticket)
                .delete(tickets::delete_tickets),
        )
        // Activity log
        .route("/logs", get(logs::list_logs).delete(logs::delete_logs))
        // Deletion requests
        .route("/deletion-requests", get(deletions::list_deletion_requests))
        .route("/deletion-requests/:id/approve", post(deletions::approve))
        .route("/deletion-requests/:id/reject", post(deletions::reject))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/:id", delete(users::delete_user).put(users::update_user))
        .merge(imports)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
