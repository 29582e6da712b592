//! Deletion request repository

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{equipment, logs::LogsRepository};
use crate::{
    error::{AppError, AppResult},
    models::{
        deletion::{DeletionRequest, RequestStatus},
        log::{LogKind, NewLogEntry},
        today,
    },
};

#[derive(Clone)]
pub struct DeletionsRepository {
    pool: Pool<Postgres>,
}

impl DeletionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Record a staff request to delete a row
    pub async fn create(
        &self,
        equipment_id: Uuid,
        requested_by: &str,
        reason: Option<&str>,
    ) -> AppResult<DeletionRequest> {
        let mut tx = self.pool.begin().await?;

        let row = equipment::lock(&mut tx, equipment_id).await?;

        let pending: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM deletion_requests WHERE equipment_id = $1 AND status = 'pending')",
        )
        .bind(equipment_id)
        .fetch_one(&mut *tx)
        .await?;

        if pending {
            return Err(AppError::Conflict(format!(
                "A deletion request for {} is already pending",
                row.name
            )));
        }

        let request = sqlx::query_as::<_, DeletionRequest>(
            r#"
            INSERT INTO deletion_requests (equipment_id, equipment_name, requested_by, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(equipment_id)
        .bind(&row.name)
        .bind(requested_by)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        LogsRepository::append(
            &mut tx,
            &NewLogEntry::new(requested_by, LogKind::DeletionRequest, &row.name, 0, "admin")
                .dated(Some(today()), None),
        )
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    pub async fn list(&self, status: Option<RequestStatus>) -> AppResult<Vec<DeletionRequest>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, DeletionRequest>(
                    "SELECT * FROM deletion_requests WHERE status = $1 ORDER BY created_at DESC",
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DeletionRequest>(
                    "SELECT * FROM deletion_requests ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Approve or reject a pending request. Approval deletes the equipment in
    /// the same transaction.
    pub async fn resolve(&self, id: i32, approve: bool, admin: &str) -> AppResult<DeletionRequest> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, DeletionRequest>(
            "SELECT * FROM deletion_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Deletion request {} not found", id)))?;

        if request.status != RequestStatus::Pending {
            return Err(AppError::BusinessRule(format!(
                "Deletion request {} is already {}",
                id,
                request.status.as_str()
            )));
        }

        let status = if approve {
            let equipment_id = request.equipment_id.ok_or_else(|| {
                AppError::BusinessRule(format!(
                    "{} no longer exists; reject the request instead",
                    request.equipment_name
                ))
            })?;
            let row = equipment::lock(&mut tx, equipment_id).await?;
            equipment::delete_locked(&mut tx, &row, admin).await?;
            RequestStatus::Approved
        } else {
            RequestStatus::Rejected
        };

        let resolved = sqlx::query_as::<_, DeletionRequest>(
            r#"
            UPDATE deletion_requests
            SET status = $2, resolved_by = $3, resolved_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(admin)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(resolved)
    }
}
