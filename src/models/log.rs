//! Activity log

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Kind of recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Register,
    Edit,
    Rent,
    Dispatch,
    Return,
    SiteReturn,
    StatusChange,
    DeletionRequest,
    Delete,
    Import,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Register => "register",
            LogKind::Edit => "edit",
            LogKind::Rent => "rent",
            LogKind::Dispatch => "dispatch",
            LogKind::Return => "return",
            LogKind::SiteReturn => "site_return",
            LogKind::StatusChange => "status_change",
            LogKind::DeletionRequest => "deletion_request",
            LogKind::Delete => "delete",
            LogKind::Import => "import",
        }
    }
}

impl std::str::FromStr for LogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" => Ok(LogKind::Register),
            "edit" => Ok(LogKind::Edit),
            "rent" => Ok(LogKind::Rent),
            "dispatch" => Ok(LogKind::Dispatch),
            "return" => Ok(LogKind::Return),
            "site_return" => Ok(LogKind::SiteReturn),
            "status_change" => Ok(LogKind::StatusChange),
            "deletion_request" => Ok(LogKind::DeletionRequest),
            "delete" => Ok(LogKind::Delete),
            "import" => Ok(LogKind::Import),
            _ => Err(format!("Invalid log kind: {}", s)),
        }
    }
}

impl_text_column!(LogKind);

/// Log entry from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LogEntry {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub actor: String,
    pub kind: LogKind,
    pub equipment_name: String,
    pub quantity: i32,
    /// Borrower, site, new status or "admin"
    pub target: String,
    pub action_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

/// Log entry to append
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub actor: String,
    pub kind: LogKind,
    pub equipment_name: String,
    pub quantity: i32,
    pub target: String,
    pub action_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

impl NewLogEntry {
    pub fn new(actor: &str, kind: LogKind, equipment_name: &str, quantity: i32, target: &str) -> Self {
        Self {
            actor: actor.to_string(),
            kind,
            equipment_name: equipment_name.to_string(),
            quantity,
            target: target.to_string(),
            action_date: None,
            due_date: None,
        }
    }

    pub fn dated(mut self, action_date: Option<NaiveDate>, due_date: Option<NaiveDate>) -> Self {
        self.action_date = action_date;
        self.due_date = due_date;
        self
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LogQuery {
    pub kind: Option<LogKind>,
    pub actor: Option<String>,
    /// Defaults to 200, capped at 1000
    pub limit: Option<i64>,
}

/// Log entries to remove
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteLogEntries {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedCount {
    pub deleted: u64,
}
