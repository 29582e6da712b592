//! Equipment status labels

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a unit of equipment currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    InStock,
    Rented,
    Dispatched,
    UnderRepair,
    Damaged,
}

impl EquipmentStatus {
    pub const ALL: [EquipmentStatus; 5] = [
        EquipmentStatus::InStock,
        EquipmentStatus::Rented,
        EquipmentStatus::Dispatched,
        EquipmentStatus::UnderRepair,
        EquipmentStatus::Damaged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::InStock => "in_stock",
            EquipmentStatus::Rented => "rented",
            EquipmentStatus::Dispatched => "dispatched",
            EquipmentStatus::UnderRepair => "under_repair",
            EquipmentStatus::Damaged => "damaged",
        }
    }

    /// Rented out or dispatched to a site
    pub fn is_out(&self) -> bool {
        matches!(self, EquipmentStatus::Rented | EquipmentStatus::Dispatched)
    }

    /// Statuses reachable through the maintenance workflow
    pub fn is_maintenance(&self) -> bool {
        matches!(
            self,
            EquipmentStatus::InStock | EquipmentStatus::UnderRepair | EquipmentStatus::Damaged
        )
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EquipmentStatus {
    type Err = String;

    /// Accepts canonical labels as well as the spreadsheet labels that older
    /// backups carry, ignoring case, separators and stray whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match folded.as_str() {
            "instock" | "stock" | "available" | "재고" => Ok(EquipmentStatus::InStock),
            "rented" | "rental" | "대여중" => Ok(EquipmentStatus::Rented),
            "dispatched" | "onsite" | "현장출고" => Ok(EquipmentStatus::Dispatched),
            "underrepair" | "repair" | "수리중" => Ok(EquipmentStatus::UnderRepair),
            "damaged" | "broken" | "파손" => Ok(EquipmentStatus::Damaged),
            _ => Err(format!("Invalid equipment status: {}", s.trim())),
        }
    }
}

impl_text_column!(EquipmentStatus);
