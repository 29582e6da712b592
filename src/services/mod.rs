//! Business logic services

pub mod equipment;
pub mod logs;
pub mod movements;
pub mod tickets;
pub mod users;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: equipment::EquipmentService,
    pub movements: movements::MovementsService,
    pub users: users::UsersService,
    pub tickets: tickets::TicketsService,
    pub logs: logs::LogsService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            equipment: equipment::EquipmentService::new(repository.clone()),
            movements: movements::MovementsService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            tickets: tickets::TicketsService::new(repository.clone(), config.tickets.clone()),
            logs: logs::LogsService::new(repository.clone()),
            repository,
        }
    }
}
