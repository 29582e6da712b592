//! Dispatch ticket history repository

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{error::AppResult, models::ticket::DispatchTicket};

#[derive(Clone)]
pub struct TicketsRepository {
    pool: Pool<Postgres>,
}

impl TicketsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, site_names: &str, writer: &str) -> AppResult<DispatchTicket> {
        let ticket = sqlx::query_as::<_, DispatchTicket>(
            r#"
            INSERT INTO dispatch_tickets (id, site_names, writer)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(site_names)
        .bind(writer)
        .fetch_one(&self.pool)
        .await?;
        Ok(ticket)
    }

    /// Ticket history, newest first
    pub async fn list(&self) -> AppResult<Vec<DispatchTicket>> {
        let rows = sqlx::query_as::<_, DispatchTicket>(
            "SELECT * FROM dispatch_tickets ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete_many(&self, ids: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM dispatch_tickets WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
