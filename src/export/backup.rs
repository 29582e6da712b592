//! CSV backup of the inventory and import of equipment and user sheets.
//!
//! Imports accept the English column names written by the export as well as
//! the Korean headers of the spreadsheets the inventory was kept in before.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{tidy, tidy_opt},
        import_report::{ImportReport, ImportedEquipment},
        user::{parse_approval, NewUser, Role},
        Equipment, EquipmentStatus,
    },
};

const BOM: &[u8] = b"\xEF\xBB\xBF";

const COLUMNS: [&str; 12] = [
    "category",
    "name",
    "quantity",
    "brand",
    "notes",
    "lender",
    "status",
    "borrower",
    "checkout_date",
    "due_date",
    "dispatch_note",
    "photo_path",
];

#[derive(Serialize)]
struct BackupRow<'a> {
    category: &'a str,
    name: &'a str,
    quantity: i32,
    brand: &'a str,
    notes: &'a str,
    lender: &'a str,
    status: &'a str,
    borrower: &'a str,
    checkout_date: String,
    due_date: String,
    dispatch_note: &'a str,
    photo_path: &'a str,
}

/// Write every row as CSV, prefixed with a UTF-8 BOM so spreadsheet
/// programs pick the right encoding.
pub fn write_equipment(rows: &[Equipment]) -> AppResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BOM.to_vec());
    writer.write_record(COLUMNS).map_err(csv_error)?;

    for row in rows {
        writer
            .serialize(BackupRow {
                category: &row.category,
                name: &row.name,
                quantity: row.quantity,
                brand: &row.brand,
                notes: &row.notes,
                lender: &row.lender,
                status: row.status.as_str(),
                borrower: row.borrower.as_deref().unwrap_or(""),
                checkout_date: date_text(row.checkout_date),
                due_date: date_text(row.due_date),
                dispatch_note: row.dispatch_note.as_deref().unwrap_or(""),
                photo_path: row.photo_path.as_deref().unwrap_or(""),
            })
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to write CSV: {}", e)))
}

fn date_text(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("Failed to write CSV: {}", e))
}

#[derive(Debug, Deserialize)]
struct RawEquipmentRow {
    #[serde(default, alias = "타입")]
    category: String,
    #[serde(default, alias = "이름")]
    name: String,
    #[serde(default, alias = "수량")]
    quantity: String,
    #[serde(default, alias = "브랜드")]
    brand: String,
    #[serde(default, alias = "특이사항")]
    notes: String,
    #[serde(default, alias = "대여업체")]
    lender: String,
    #[serde(default, alias = "대여여부")]
    status: String,
    #[serde(default, alias = "대여자")]
    borrower: String,
    #[serde(default, alias = "대여일")]
    checkout_date: String,
    #[serde(default, alias = "반납예정일")]
    due_date: String,
    #[serde(default, alias = "출고비고")]
    dispatch_note: String,
    #[serde(default, alias = "사진")]
    photo_path: String,
}

fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes)
}

/// Parse an equipment sheet. Rows that cannot be used are recorded in the
/// report and left out.
pub fn parse_equipment(bytes: &[u8], report: &mut ImportReport) -> AppResult<Vec<ImportedEquipment>> {
    let mut rdr = reader(bytes);
    check_headers(&mut rdr, &["name", "이름"], "name")?;

    let mut rows = Vec::new();
    for (i, record) in rdr.deserialize::<RawEquipmentRow>().enumerate() {
        let row = i + 1;
        let parsed = record
            .map_err(|e| e.to_string())
            .and_then(|raw| equipment_row(row, raw));
        match parsed {
            Ok(item) => rows.push(item),
            Err(message) => report.error(row, message),
        }
    }
    Ok(rows)
}

fn check_headers(rdr: &mut csv::Reader<&[u8]>, accepted: &[&str], label: &str) -> AppResult<()> {
    let headers = rdr
        .headers()
        .map_err(|e| AppError::BadRequest(format!("Unreadable CSV header: {}", e)))?;
    if headers.iter().any(|h| accepted.contains(&h)) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("CSV is missing a {} column", label)))
    }
}

fn equipment_row(row: usize, raw: RawEquipmentRow) -> Result<ImportedEquipment, String> {
    let name = tidy(&raw.name);
    if name.is_empty() {
        return Err("name is empty".to_string());
    }

    let quantity = parse_quantity(&raw.quantity)?;
    let status = if raw.status.trim().is_empty() {
        EquipmentStatus::InStock
    } else {
        raw.status.parse::<EquipmentStatus>()?
    };

    let mut item = ImportedEquipment {
        row,
        category: tidy(&raw.category),
        name,
        quantity,
        brand: tidy(&raw.brand),
        notes: raw.notes,
        lender: tidy(&raw.lender),
        status,
        borrower: tidy_opt(Some(raw.borrower.as_str())),
        checkout_date: parse_date(&raw.checkout_date)?,
        due_date: parse_date(&raw.due_date)?,
        dispatch_note: tidy_opt(Some(raw.dispatch_note.as_str())),
        photo_path: tidy_opt(Some(raw.photo_path.as_str())),
    };

    if status.is_out() {
        if item.borrower.is_none() {
            return Err(format!("{} row has no borrower", status));
        }
    } else {
        item.borrower = None;
        item.checkout_date = None;
        item.due_date = None;
        item.dispatch_note = None;
    }

    Ok(item)
}

/// Whole positive numbers; spreadsheets often write them as "3.0"
fn parse_quantity(raw: &str) -> Result<i32, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("quantity is empty".to_string());
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("quantity '{}' is not a number", raw))?;
    if !value.is_finite() || value.fract() != 0.0 || value < 1.0 || value > f64::from(i32::MAX) {
        return Err(format!("quantity '{}' must be a whole number of at least 1", raw));
    }
    Ok(value as i32)
}

/// Dates may carry a trailing time part ("2024-03-01 00:00:00")
fn parse_date(raw: &str) -> Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", raw))
}

#[derive(Debug, Deserialize)]
struct RawUserRow {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    approved: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    birthdate: String,
}

/// Parse the users sheet. Password cells carry hashes, never plain text.
pub fn parse_users(bytes: &[u8], report: &mut ImportReport) -> AppResult<Vec<(usize, NewUser)>> {
    let mut rdr = reader(bytes);
    check_headers(&mut rdr, &["username"], "username")?;

    let mut users = Vec::new();
    for (i, record) in rdr.deserialize::<RawUserRow>().enumerate() {
        let row = i + 1;
        match record.map_err(|e| e.to_string()).and_then(user_row) {
            Ok(user) => users.push((row, user)),
            Err(message) => report.error(row, message),
        }
    }
    Ok(users)
}

fn user_row(raw: RawUserRow) -> Result<NewUser, String> {
    let username = tidy(&raw.username);
    if username.is_empty() {
        return Err("username is empty".to_string());
    }
    if raw.password.is_empty() {
        return Err(format!("{} has no password hash", username));
    }

    Ok(NewUser {
        username,
        password_hash: raw.password,
        role: raw.role.parse::<Role>()?,
        approved: parse_approval(&raw.approved),
        birthdate: tidy_opt(Some(raw.birthdate.as_str())),
        created_at: parse_timestamp(&raw.created_at),
    })
}

/// Timestamps as the old sheet wrote them; unreadable ones fall back to now
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| dt.and_utc())
}
