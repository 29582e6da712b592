//! Repository layer for database operations

pub mod deletions;
pub mod equipment;
pub mod logs;
pub mod tickets;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub equipment: equipment::EquipmentRepository,
    pub users: users::UsersRepository,
    pub logs: logs::LogsRepository,
    pub tickets: tickets::TicketsRepository,
    pub deletions: deletions::DeletionsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            logs: logs::LogsRepository::new(pool.clone()),
            tickets: tickets::TicketsRepository::new(pool.clone()),
            deletions: deletions::DeletionsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
