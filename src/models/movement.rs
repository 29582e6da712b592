//! Stock movements: rent, dispatch, return and maintenance status changes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{equipment::Equipment, status::EquipmentStatus};
use crate::error::{AppError, AppResult};

/// Rent gear to an external company
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RentRequest {
    pub version: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(min = 1, message = "Borrower is required"))]
    pub borrower: String,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Send gear to a job site
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DispatchRequest {
    pub version: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(min = 1, message = "Site is required"))]
    pub site: String,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    pub note: Option<String>,
}

/// Take back rented or dispatched gear
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnRequest {
    pub version: i32,
    /// Defaults to the whole row
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
}

/// Move gear between stock, repair and damaged
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StatusChangeRequest {
    pub version: i32,
    pub status: EquipmentStatus,
    /// Defaults to the whole row
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
}

/// Checkout details applied to the moved units
#[derive(Debug, Clone)]
pub struct Checkout {
    pub borrower: String,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    pub note: Option<String>,
}

impl Checkout {
    pub fn check_dates(&self) -> AppResult<()> {
        if self.due_date < self.checkout_date {
            return Err(AppError::Validation(
                "Due date cannot be before the checkout date".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a single-row movement
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementOutcome {
    /// The row the units came from; absent when it was used up
    pub source: Option<Equipment>,
    /// The row now holding the moved units
    pub moved: Equipment,
}

/// Result of returning everything held by one borrower or site
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteReturnOutcome {
    pub site: String,
    pub returned_entries: usize,
    pub returned_units: i64,
    /// In-stock rows that received the units
    pub stock: Vec<Equipment>,
}

/// How a movement is written to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePlan {
    /// The whole row changes status in place
    Flip,
    /// The moved units leave for a new row; the source keeps `remaining`
    Split { remaining: i32 },
    /// The moved units join an existing in-stock row; a source left with
    /// nothing is deleted
    Merge { into: Uuid, remaining: i32 },
}

/// Whether `from` may move directly to `to`
pub fn check_transition(from: EquipmentStatus, to: EquipmentStatus) -> AppResult<()> {
    let allowed = match to {
        EquipmentStatus::Rented | EquipmentStatus::Dispatched => from == EquipmentStatus::InStock,
        EquipmentStatus::InStock => from != EquipmentStatus::InStock,
        EquipmentStatus::UnderRepair | EquipmentStatus::Damaged => {
            from.is_maintenance() && from != to
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::BusinessRule(format!(
            "Cannot move equipment from {} to {}",
            from, to
        )))
    }
}

/// Decide how `quantity` units of `source` move to `target`.
///
/// `stock_match` is the in-stock row sharing the source's match key, if one
/// exists; it only matters when the target is `in_stock`.
pub fn plan_move(
    source: &Equipment,
    quantity: i32,
    target: EquipmentStatus,
    stock_match: Option<&Equipment>,
) -> AppResult<MovePlan> {
    check_transition(source.status, target)?;

    if quantity < 1 || quantity > source.quantity {
        return Err(AppError::BusinessRule(format!(
            "Quantity must be between 1 and {}",
            source.quantity
        )));
    }

    let remaining = source.quantity - quantity;

    if target == EquipmentStatus::InStock {
        if let Some(stock) = stock_match.filter(|m| {
            m.id != source.id && m.status == EquipmentStatus::InStock
        }) {
            if stock.quantity.checked_add(quantity).is_none() {
                return Err(AppError::BusinessRule(format!(
                    "Returning {} units would exceed the largest quantity a row can hold",
                    quantity
                )));
            }
            return Ok(MovePlan::Merge {
                into: stock.id,
                remaining,
            });
        }
    }

    if remaining == 0 {
        Ok(MovePlan::Flip)
    } else {
        Ok(MovePlan::Split { remaining })
    }
}
