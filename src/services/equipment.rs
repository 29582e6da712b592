//! Equipment service

use uuid::Uuid;
use validator::Validate;

use crate::models::today;
use crate::{
    error::{AppError, AppResult},
    export,
    models::{
        deletion::{CreateDeletionRequest, DeletionRequest, RequestStatus},
        equipment::{CreateEquipment, Equipment, EquipmentQuery, SiteSummary, StatusSummary, UpdateEquipment},
        import_report::ImportReport,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let today = today();
        let rows = self.repository.equipment.list(query, today).await?;
        Ok(rows.into_iter().map(|r| r.with_overdue_flag(today)).collect())
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Equipment> {
        let row = self.repository.equipment.get_by_id(id).await?;
        Ok(row.with_overdue_flag(today()))
    }

    pub async fn summary(&self) -> AppResult<StatusSummary> {
        self.repository.equipment.summary(today()).await
    }

    pub async fn sites(&self) -> AppResult<Vec<SiteSummary>> {
        self.repository.equipment.sites().await
    }

    /// Register new stock
    pub async fn create(&self, data: &CreateEquipment, actor: &str) -> AppResult<Equipment> {
        data.validate()?;
        if data.name.trim().is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }

        let row = self.repository.equipment.create(data, actor).await?;
        tracing::info!(id = %row.id, name = %row.name, quantity = row.quantity, actor, "equipment registered");
        Ok(row)
    }

    pub async fn update(&self, id: Uuid, data: &UpdateEquipment, actor: &str) -> AppResult<Equipment> {
        data.validate()?;
        if data.is_empty() {
            return Err(AppError::BadRequest("Nothing to update".to_string()));
        }
        if data.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }

        let row = self.repository.equipment.update(id, data, actor).await?;
        tracing::info!(id = %row.id, version = row.version, actor, "equipment edited");
        Ok(row.with_overdue_flag(today()))
    }

    /// Remove a row immediately (administrators only)
    pub async fn delete(&self, id: Uuid, version: Option<i32>, actor: &str) -> AppResult<()> {
        let row = self.repository.equipment.delete(id, version, actor).await?;
        tracing::info!(id = %row.id, name = %row.name, actor, "equipment deleted");
        Ok(())
    }

    /// Ask an administrator to delete a row
    pub async fn request_deletion(
        &self,
        id: Uuid,
        data: &CreateDeletionRequest,
        actor: &str,
    ) -> AppResult<DeletionRequest> {
        let reason = data.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
        let request = self.repository.deletions.create(id, actor, reason).await?;
        tracing::info!(request = request.id, equipment = %id, actor, "deletion requested");
        Ok(request)
    }

    pub async fn deletion_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<DeletionRequest>> {
        self.repository.deletions.list(status).await
    }

    pub async fn resolve_deletion(&self, id: i32, approve: bool, admin: &str) -> AppResult<DeletionRequest> {
        let request = self.repository.deletions.resolve(id, approve, admin).await?;
        tracing::info!(request = request.id, status = request.status.as_str(), admin, "deletion request resolved");
        Ok(request)
    }

    /// Full inventory as a CSV backup
    pub async fn export_csv(&self) -> AppResult<Vec<u8>> {
        let rows = self.repository.equipment.all().await?;
        export::write_equipment(&rows)
    }

    /// Load a CSV backup. Unusable rows are reported; the rest are written in
    /// one transaction.
    pub async fn import_csv(&self, bytes: &[u8], actor: &str) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();
        let rows = export::parse_equipment(bytes, &mut report)?;

        if !rows.is_empty() {
            self.repository.equipment.import(&rows, actor, &mut report).await?;
        }

        tracing::info!(
            imported = report.imported,
            merged = report.merged,
            errors = report.errors.len(),
            actor,
            "equipment import finished"
        );
        Ok(report)
    }
}
