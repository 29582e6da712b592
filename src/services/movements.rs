//! Rent, dispatch, return and maintenance moves

use uuid::Uuid;
use validator::Validate;

use crate::models::today;
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{tidy, tidy_opt},
        log::LogKind,
        movement::{
            Checkout, DispatchRequest, MovementOutcome, RentRequest, ReturnRequest,
            SiteReturnOutcome, StatusChangeRequest,
        },
        EquipmentStatus,
    },
    repository::{equipment::MoveRequest, Repository},
};

#[derive(Clone)]
pub struct MovementsService {
    repository: Repository,
}

impl MovementsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Rent units to an external company
    pub async fn rent(&self, id: Uuid, data: &RentRequest, actor: &str) -> AppResult<MovementOutcome> {
        data.validate()?;
        let checkout = checkout(
            EquipmentStatus::Rented,
            &data.borrower,
            data.checkout_date,
            data.due_date,
            None,
        )?;

        self.apply(
            MoveRequest {
                id,
                expected_version: data.version,
                quantity: Some(data.quantity),
                target: EquipmentStatus::Rented,
                checkout: Some(checkout),
                log_kind: LogKind::Rent,
            },
            actor,
        )
        .await
    }

    /// Send units to a job site
    pub async fn dispatch(&self, id: Uuid, data: &DispatchRequest, actor: &str) -> AppResult<MovementOutcome> {
        data.validate()?;
        let checkout = checkout(
            EquipmentStatus::Dispatched,
            &data.site,
            data.checkout_date,
            data.due_date,
            data.note.as_deref(),
        )?;

        self.apply(
            MoveRequest {
                id,
                expected_version: data.version,
                quantity: Some(data.quantity),
                target: EquipmentStatus::Dispatched,
                checkout: Some(checkout),
                log_kind: LogKind::Dispatch,
            },
            actor,
        )
        .await
    }

    /// Bring rented or dispatched units back into stock
    pub async fn return_units(&self, id: Uuid, data: &ReturnRequest, actor: &str) -> AppResult<MovementOutcome> {
        data.validate()?;
        self.apply(
            MoveRequest {
                id,
                expected_version: data.version,
                quantity: data.quantity,
                target: EquipmentStatus::InStock,
                checkout: None,
                log_kind: LogKind::Return,
            },
            actor,
        )
        .await
    }

    /// Return everything out with one borrower or site
    pub async fn return_site(&self, site: &str, actor: &str) -> AppResult<SiteReturnOutcome> {
        let site = tidy(site);
        if site.is_empty() {
            return Err(AppError::Validation("Site is required".to_string()));
        }

        let mut outcome = self.repository.equipment.return_site(&site, actor).await?;
        let today = today();
        outcome.stock = outcome
            .stock
            .into_iter()
            .map(|r| r.with_overdue_flag(today))
            .collect();

        tracing::info!(
            site = %outcome.site,
            entries = outcome.returned_entries,
            units = outcome.returned_units,
            actor,
            "site returned"
        );
        Ok(outcome)
    }

    /// Move units between stock, repair and damaged
    pub async fn change_status(
        &self,
        id: Uuid,
        data: &StatusChangeRequest,
        actor: &str,
    ) -> AppResult<MovementOutcome> {
        data.validate()?;
        if !data.status.is_maintenance() {
            return Err(AppError::BusinessRule(format!(
                "Use rent or dispatch to move equipment to {}",
                data.status
            )));
        }

        self.apply(
            MoveRequest {
                id,
                expected_version: data.version,
                quantity: data.quantity,
                target: data.status,
                checkout: None,
                log_kind: LogKind::StatusChange,
            },
            actor,
        )
        .await
    }

    async fn apply(&self, request: MoveRequest, actor: &str) -> AppResult<MovementOutcome> {
        let outcome = self.repository.equipment.move_units(&request, actor).await?;
        let today = today();

        tracing::info!(
            id = %request.id,
            kind = request.log_kind.as_str(),
            target = request.target.as_str(),
            moved_into = %outcome.moved.id,
            actor,
            "equipment moved"
        );

        Ok(MovementOutcome {
            source: outcome.source.map(|r| r.with_overdue_flag(today)),
            moved: outcome.moved.with_overdue_flag(today),
        })
    }
}

fn checkout(
    status: EquipmentStatus,
    borrower: &str,
    checkout_date: chrono::NaiveDate,
    due_date: chrono::NaiveDate,
    note: Option<&str>,
) -> AppResult<Checkout> {
    let borrower = tidy(borrower);
    if borrower.is_empty() {
        return Err(AppError::Validation(match status {
            EquipmentStatus::Dispatched => "Site is required".to_string(),
            _ => "Borrower is required".to_string(),
        }));
    }

    let checkout = Checkout {
        borrower,
        checkout_date,
        due_date,
        note: tidy_opt(note),
    };
    checkout.check_dates()?;
    Ok(checkout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn borrower_is_tidied() {
        let c = checkout(EquipmentStatus::Rented, "  Acme   Sound ", day(1), day(3), None).unwrap();
        assert_eq!(c.borrower, "Acme Sound");
        assert_eq!(c.note, None);
    }

    #[test]
    fn blank_borrower_is_rejected() {
        let err = checkout(EquipmentStatus::Dispatched, "   ", day(1), day(3), Some("x")).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Site is required"));
    }

    #[test]
    fn due_date_before_checkout_is_rejected() {
        let err = checkout(EquipmentStatus::Rented, "Acme", day(5), day(4), None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(checkout(EquipmentStatus::Rented, "Acme", day(5), day(5), None).is_ok());
    }

    #[test]
    fn blank_note_becomes_none() {
        let c = checkout(EquipmentStatus::Dispatched, "Hall", day(1), day(2), Some("  ")).unwrap();
        assert_eq!(c.note, None);
    }
}
