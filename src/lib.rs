//! Gearhouse equipment inventory server
//!
//! A REST JSON API for tracking audio and LED gear through stock, rentals,
//! site dispatches and repair, with an activity log and printable dispatch
//! tickets.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire repository and services around a database pool
    pub fn new(config: AppConfig, pool: sqlx::PgPool) -> Self {
        let repository = repository::Repository::new(pool);
        let services = services::Services::new(repository, &config);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
