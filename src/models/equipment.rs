//! Equipment model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use unicode_normalization::UnicodeNormalization;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::status::EquipmentStatus;

/// One row of the inventory. A physical batch of identical gear may be
/// spread over several rows when part of it is rented or dispatched.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: Uuid,
    pub category: String,
    pub name: String,
    pub quantity: i32,
    pub brand: String,
    pub notes: String,
    /// Company the gear was rented in from, if any
    pub lender: String,
    pub status: EquipmentStatus,
    /// Renter or dispatch site
    pub borrower: Option<String>,
    pub checkout_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub dispatch_note: Option<String>,
    pub photo_path: Option<String>,
    /// Optimistic concurrency counter; echo it back on every mutation
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub is_overdue: bool,
}

impl Equipment {
    pub fn match_key(&self) -> MatchKey {
        MatchKey::new(&self.name, &self.brand)
    }

    /// Out past its due date
    pub fn overdue_on(&self, today: NaiveDate) -> bool {
        self.status.is_out() && self.due_date.map(|d| d < today).unwrap_or(false)
    }

    pub fn with_overdue_flag(mut self, today: NaiveDate) -> Self {
        self.is_overdue = self.overdue_on(today);
        self
    }
}

/// Trim and collapse inner whitespace. Stored text goes through this so that
/// filters and merges are not defeated by invisible differences.
pub fn tidy(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tidy an optional field, mapping blank values to `None`
pub fn tidy_opt(s: Option<&str>) -> Option<String> {
    s.map(tidy).filter(|s| !s.is_empty())
}

/// Normalized name + brand identifying interchangeable stock
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey(String);

impl MatchKey {
    pub fn new(name: &str, brand: &str) -> Self {
        Self(format!("{}\u{1f}{}", fold(name), fold(brand)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn fold(s: &str) -> String {
    let composed: String = s.nfkc().collect();
    tidy(&composed).to_lowercase()
}

/// Register equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[serde(default)]
    pub category: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub lender: String,
    pub photo_path: Option<String>,
}

/// Edit descriptive fields. Status, borrower and dates only change through
/// movements.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    pub version: i32,
    pub category: Option<String>,
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
    pub brand: Option<String>,
    pub notes: Option<String>,
    pub lender: Option<String>,
    pub photo_path: Option<String>,
}

impl UpdateEquipment {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.name.is_none()
            && self.quantity.is_none()
            && self.brand.is_none()
            && self.notes.is_none()
            && self.lender.is_none()
            && self.photo_path.is_none()
    }
}

/// Equipment list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentQuery {
    /// Case-insensitive text search over every text column
    pub search: Option<String>,
    pub status: Option<EquipmentStatus>,
    /// `true` keeps only rows past their due date, `false` leaves them out
    pub overdue: Option<bool>,
}

/// Unit counts per status, as shown on the dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StatusSummary {
    pub in_stock: i64,
    pub rented: i64,
    pub dispatched: i64,
    pub under_repair: i64,
    pub damaged: i64,
    pub overdue: i64,
}

impl StatusSummary {
    pub fn add(&mut self, status: EquipmentStatus, units: i64) {
        let slot = match status {
            EquipmentStatus::InStock => &mut self.in_stock,
            EquipmentStatus::Rented => &mut self.rented,
            EquipmentStatus::Dispatched => &mut self.dispatched,
            EquipmentStatus::UnderRepair => &mut self.under_repair,
            EquipmentStatus::Damaged => &mut self.damaged,
        };
        *slot += units;
    }
}

/// A dispatch site with what is currently out there
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SiteSummary {
    pub site: String,
    pub entries: i64,
    pub units: i64,
    pub earliest_due: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: EquipmentStatus, due: Option<NaiveDate>) -> Equipment {
        Equipment {
            id: Uuid::new_v4(),
            category: "LED".into(),
            name: "Par 64".into(),
            quantity: 4,
            brand: "Chauvet".into(),
            notes: String::new(),
            lender: String::new(),
            status,
            borrower: Some("Hall A".into()),
            checkout_date: None,
            due_date: due,
            dispatch_note: None,
            photo_path: None,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_overdue: false,
        }
    }

    #[test]
    fn tidy_collapses_whitespace() {
        assert_eq!(tidy("  LED \t Par  64 "), "LED Par 64");
        assert_eq!(tidy_opt(Some("   ")), None);
        assert_eq!(tidy_opt(Some(" Site B ")), Some("Site B".to_string()));
    }

    #[test]
    fn match_key_ignores_case_width_and_spacing() {
        let a = MatchKey::new("LED  Par 64", "Chauvet ");
        let b = MatchKey::new("led par 64", "CHAUVET");
        let c = MatchKey::new("ＬＥＤ Par 64", "Chauvet");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn match_key_keeps_name_and_brand_apart() {
        assert_ne!(MatchKey::new("Par", "64 Chauvet"), MatchKey::new("Par 64", "Chauvet"));
    }

    #[test]
    fn overdue_only_when_out() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        assert!(sample(EquipmentStatus::Rented, Some(yesterday)).overdue_on(today));
        assert!(sample(EquipmentStatus::Dispatched, Some(yesterday)).overdue_on(today));
        assert!(!sample(EquipmentStatus::Rented, Some(today)).overdue_on(today));
        assert!(!sample(EquipmentStatus::InStock, Some(yesterday)).overdue_on(today));
        assert!(!sample(EquipmentStatus::Rented, None).overdue_on(today));
    }

    #[test]
    fn summary_accumulates_per_status() {
        let mut summary = StatusSummary::default();
        summary.add(EquipmentStatus::Rented, 3);
        summary.add(EquipmentStatus::Rented, 2);
        summary.add(EquipmentStatus::Damaged, 1);
        assert_eq!(summary.rented, 5);
        assert_eq!(summary.damaged, 1);
        assert_eq!(summary.in_stock, 0);
    }
}
