//! Import report returned by the CSV import endpoints

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::status::EquipmentStatus;

/// A row that could not be imported
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RowError {
    /// 1-based data row number, header excluded
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ImportReport {
    /// Rows inserted as new entries
    pub imported: usize,
    /// In-stock rows folded into an existing entry with the same name and brand
    pub merged: usize,
    /// Rows skipped because they already exist
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn error(&mut self, row: usize, message: impl Into<String>) {
        self.errors.push(RowError {
            row,
            message: message.into(),
        });
    }
}

/// A parsed backup row ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedEquipment {
    pub row: usize,
    pub category: String,
    pub name: String,
    pub quantity: i32,
    pub brand: String,
    pub notes: String,
    pub lender: String,
    pub status: EquipmentStatus,
    pub borrower: Option<String>,
    pub checkout_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub dispatch_note: Option<String>,
    pub photo_path: Option<String>,
}
