//! Dispatch ticket workbook: one worksheet per site listing what was sent
//! there

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::{
    error::{AppError, AppResult},
    models::{equipment::tidy, Equipment},
};

const HEADERS: [&str; 6] = ["Equipment", "Brand", "Quantity", "Dispatch date", "Due date", "Note"];
const WIDTHS: [f64; 6] = [25.0, 15.0, 10.0, 15.0, 15.0, 30.0];
const HEADER_ROW: u32 = 4;
/// Excel allows 31; one is left for the de-duplication suffix to grow into
const SHEET_NAME_LIMIT: usize = 30;

/// A rendered ticket and the sites that made it into the workbook
#[derive(Debug)]
pub struct DispatchWorkbook {
    pub bytes: Vec<u8>,
    pub sites: Vec<String>,
}

/// Build the ticket for the requested sites. Sites with nothing dispatched
/// are left out; if none remain the ticket is refused.
pub fn render_dispatch_ticket(
    title: &str,
    sites: &[String],
    rows: &[Equipment],
    handler: &str,
    printed_at: NaiveDateTime,
) -> AppResult<DispatchWorkbook> {
    let groups = group_by_site(sites, rows);
    if groups.is_empty() {
        return Err(AppError::NotFound(
            "None of the selected sites has dispatched equipment".to_string(),
        ));
    }

    let bytes = write_workbook(title, &groups, handler, printed_at)
        .map_err(|e| AppError::Internal(format!("Failed to build dispatch ticket: {}", e)))?;

    Ok(DispatchWorkbook {
        bytes,
        sites: groups.into_iter().map(|(site, _)| site).collect(),
    })
}

/// Requested sites in request order, each with its dispatched rows
fn group_by_site<'a>(sites: &[String], rows: &'a [Equipment]) -> Vec<(String, Vec<&'a Equipment>)> {
    let mut seen = HashSet::new();
    let mut groups = Vec::new();

    for site in sites.iter().map(|s| tidy(s)) {
        if site.is_empty() || !seen.insert(site.clone()) {
            continue;
        }
        let matching: Vec<&Equipment> = rows
            .iter()
            .filter(|r| r.status.is_out() && r.borrower.as_deref() == Some(site.as_str()))
            .collect();
        if !matching.is_empty() {
            groups.push((site, matching));
        }
    }

    groups
}

fn write_workbook(
    title: &str,
    groups: &[(String, Vec<&Equipment>)],
    handler: &str,
    printed_at: NaiveDateTime,
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let mut used_names = HashSet::new();

    let title_format = Format::new().set_bold().set_font_size(16);
    let header_format = Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_background_color(Color::RGB(0xD9E1F2));
    let cell_format = Format::new().set_border(FormatBorder::Thin);

    for (site, rows) in groups {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(site, &mut used_names))?;

        sheet.write_string_with_format(0, 0, format!("{} ({})", title, site), &title_format)?;
        sheet.write_string(1, 0, format!("Site: {}", site))?;
        sheet.write_string(2, 0, format!("Handler: {}", handler))?;
        sheet.write_string(2, 3, format!("Printed: {}", printed_at.format("%Y-%m-%d %H:%M")))?;

        for (col, header) in HEADERS.iter().enumerate() {
            sheet.write_string_with_format(HEADER_ROW, col as u16, *header, &header_format)?;
        }

        for (i, row) in rows.iter().enumerate() {
            write_row(sheet, HEADER_ROW + 1 + i as u32, row, &cell_format)?;
        }

        for (col, width) in WIDTHS.iter().enumerate() {
            sheet.set_column_width(col as u16, *width)?;
        }
    }

    workbook.save_to_buffer()
}

fn write_row(sheet: &mut Worksheet, r: u32, row: &Equipment, format: &Format) -> Result<(), XlsxError> {
    sheet.write_string_with_format(r, 0, row.name.as_str(), format)?;
    sheet.write_string_with_format(r, 1, row.brand.as_str(), format)?;
    sheet.write_number_with_format(r, 2, f64::from(row.quantity), format)?;
    sheet.write_string_with_format(r, 3, date_cell(row.checkout_date), format)?;
    sheet.write_string_with_format(r, 4, date_cell(row.due_date), format)?;
    sheet.write_string_with_format(r, 5, row.dispatch_note.as_deref().unwrap_or(""), format)?;
    Ok(())
}

fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// Turn a site name into a worksheet name Excel accepts, unique within the
/// workbook (Excel compares sheet names case-insensitively).
pub fn sheet_name(site: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = site
        .chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '*' | '[' | ']' | ':' => '_',
            c => c,
        })
        .collect();
    let cleaned: String = cleaned.chars().take(SHEET_NAME_LIMIT).collect();
    let base = match trim_sheet_name(&cleaned) {
        "" => "Site".to_string(),
        trimmed => trimmed.to_string(),
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while !used.insert(candidate.to_lowercase()) {
        let suffix = format!(" ({})", n);
        let keep = SHEET_NAME_LIMIT.saturating_sub(suffix.chars().count());
        let head: String = base.chars().take(keep).collect();
        candidate = format!("{}{}", trim_sheet_name(&head), suffix);
        n += 1;
    }
    candidate
}

/// Excel rejects names that start or end with an apostrophe
fn trim_sheet_name(name: &str) -> &str {
    name.trim().trim_matches('\'').trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EquipmentStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn dispatched(name: &str, site: &str, quantity: i32) -> Equipment {
        Equipment {
            id: Uuid::new_v4(),
            category: "Audio".into(),
            name: name.into(),
            quantity,
            brand: "Shure".into(),
            notes: String::new(),
            lender: String::new(),
            status: EquipmentStatus::Dispatched,
            borrower: Some(site.into()),
            checkout_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 3),
            dispatch_note: Some("stage left".into()),
            photo_path: None,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_overdue: false,
        }
    }

    fn printed() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn sheet_names_drop_forbidden_characters() {
        let mut used = HashSet::new();
        assert_eq!(sheet_name("Hall A/B [main]: day?", &mut used), "Hall A_B _main__ day_");
    }

    #[test]
    fn sheet_names_are_truncated() {
        let mut used = HashSet::new();
        let name = sheet_name(&"x".repeat(50), &mut used);
        assert_eq!(name.chars().count(), 30);
    }

    #[test]
    fn duplicate_sheet_names_get_a_suffix() {
        let mut used = HashSet::new();
        assert_eq!(sheet_name("Arena", &mut used), "Arena");
        assert_eq!(sheet_name("arena", &mut used), "arena (2)");
        assert_eq!(sheet_name("Arena", &mut used), "Arena (3)");

        let long = "y".repeat(40);
        let first = sheet_name(&long, &mut used);
        let second = sheet_name(&long, &mut used);
        assert_ne!(first.to_lowercase(), second.to_lowercase());
        assert!(second.chars().count() <= 30);
        assert!(second.ends_with(" (2)"));
    }

    #[test]
    fn truncation_never_leaves_an_edge_apostrophe() {
        let site = format!("{}'tail", "x".repeat(29));
        let mut used = HashSet::new();
        let first = sheet_name(&site, &mut used);
        assert_eq!(first, "x".repeat(29));

        let second = sheet_name(&format!("{}'more", "x".repeat(29)), &mut used);
        assert!(!second.ends_with('\''));
        assert!(second.ends_with(" (2)"));

        let quoted = sheet_name(&format!("{}'", "z".repeat(24)), &mut HashSet::from(["z".repeat(24)]));
        assert_eq!(quoted, format!("{} (2)", "z".repeat(24)));
    }

    #[test]
    fn ticket_for_a_long_quoted_site_renders() {
        let site = format!("{}'tail", "x".repeat(29));
        let rows = vec![dispatched("SM58", &site, 2)];
        let ticket = render_dispatch_ticket("Ticket", &[site.clone()], &rows, "kim", printed()).unwrap();
        assert_eq!(ticket.sites, vec![site]);
    }

    #[test]
    fn blank_site_still_gets_a_name() {
        let mut used = HashSet::new();
        assert_eq!(sheet_name("''", &mut used), "Site");
    }

    #[test]
    fn renders_a_zip_container() {
        let rows = vec![dispatched("SM58", "Arena", 4), dispatched("Beta 91", "Club", 1)];
        let ticket = render_dispatch_ticket(
            "Equipment Dispatch Ticket",
            &["Arena".to_string(), "Club".to_string()],
            &rows,
            "kim",
            printed(),
        )
        .unwrap();

        assert_eq!(&ticket.bytes[..2], b"PK");
        assert_eq!(ticket.sites, vec!["Arena", "Club"]);
    }

    #[test]
    fn sheet_layout() {
        use calamine::{open_workbook_auto_from_rs, Reader};

        let rows = vec![dispatched("SM58", "Hall A/B", 4)];
        let ticket = render_dispatch_ticket("Ticket", &["Hall A/B".to_string()], &rows, "kim", printed())
            .unwrap();

        let mut workbook = open_workbook_auto_from_rs(std::io::Cursor::new(ticket.bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Hall A_B".to_string()]);

        let range = workbook.worksheet_range("Hall A_B").unwrap();
        let cell = |r: u32, c: u32| range.get_value((r, c)).map(|v| v.to_string()).unwrap_or_default();
        assert_eq!(cell(0, 0), "Ticket (Hall A/B)");
        assert_eq!(cell(1, 0), "Site: Hall A/B");
        assert_eq!(cell(2, 0), "Handler: kim");
        assert_eq!(cell(2, 3), "Printed: 2024-05-01 09:30");
        assert_eq!(cell(4, 0), "Equipment");
        assert_eq!(cell(4, 5), "Note");
        assert_eq!(cell(5, 0), "SM58");
        assert_eq!(cell(5, 2), "4");
        assert_eq!(cell(5, 4), "2024-05-03");
        assert_eq!(cell(5, 5), "stage left");
    }

    #[test]
    fn sites_without_rows_are_skipped() {
        let rows = vec![dispatched("SM58", "Arena", 4)];
        let ticket = render_dispatch_ticket(
            "Ticket",
            &["Empty lot".to_string(), "Arena".to_string(), "Arena".to_string()],
            &rows,
            "kim",
            printed(),
        )
        .unwrap();
        assert_eq!(ticket.sites, vec!["Arena"]);
    }

    #[test]
    fn no_rows_at_all_is_not_found() {
        let err = render_dispatch_ticket("Ticket", &["Nowhere".to_string()], &[], "kim", printed())
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
