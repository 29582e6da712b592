//! Activity log repository

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::AppResult,
    models::log::{LogEntry, LogQuery, NewLogEntry},
};

const DEFAULT_LIMIT: i64 = 200;
const MAX_LIMIT: i64 = 1000;

#[derive(Clone)]
pub struct LogsRepository {
    pool: Pool<Postgres>,
}

impl LogsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Append an entry on the caller's connection so it commits or rolls
    /// back together with the change it records.
    pub async fn append(conn: &mut PgConnection, entry: &NewLogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (actor, kind, equipment_name, quantity, target, action_date, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&entry.actor)
        .bind(entry.kind)
        .bind(&entry.equipment_name)
        .bind(entry.quantity)
        .bind(&entry.target)
        .bind(entry.action_date)
        .bind(entry.due_date)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// List entries, newest first
    pub async fn list(&self, query: &LogQuery) -> AppResult<Vec<LogEntry>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.kind.is_some() {
            conditions.push(format!("kind = ${}", idx));
            idx += 1;
        }
        if query.actor.is_some() {
            conditions.push(format!("LOWER(actor) = LOWER(${})", idx));
            idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT * FROM activity_log {} ORDER BY created_at DESC, id DESC LIMIT ${}",
            where_clause, idx
        );

        let mut builder = sqlx::query_as::<_, LogEntry>(&sql);
        if let Some(kind) = query.kind {
            builder = builder.bind(kind);
        }
        if let Some(ref actor) = query.actor {
            builder = builder.bind(actor);
        }
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let rows = builder.bind(limit).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn delete_many(&self, ids: &[i64]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM activity_log WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
