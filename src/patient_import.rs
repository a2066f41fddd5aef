//! Bulk patient registration from a spreadsheet.
//!
//! The upload is either the workbook itself (xlsx, xls or ods; only the first
//! worksheet is read) or a CSV export of it. Either way the first row holds
//! the column names below and each following row is one patient. Columns the
//! importer does not know are ignored. Rows are registered one at a time with
//! no surrounding transaction; a row that cannot be registered is reported in
//! the `skipped` list and the import carries on.

use std::io::Cursor;

use calamine::{Data, DataType, Reader};
use csv::StringRecord;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::accounts::Actor;
use crate::api::error::ApiError;
use crate::models::enums::Gender;
use crate::models::{NewPatient, PatientView};
use crate::patients;

/// How many created patients are echoed back in the response.
pub const PREVIEW_LIMIT: usize = 5;

/// Zip container (xlsx, ods) and OLE compound file (xls) signatures.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImportRow {
    tc_identity_number: Option<String>,
    registration_number: Option<String>,
    passport_number: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    birth_date: Option<String>,
    gender: Option<String>,
    mother_name: Option<String>,
    father_name: Option<String>,
    mobile_phone: Option<String>,
    home_phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SkippedRow {
    /// 1-based line in the sheet; line 1 is the header.
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub patients: Vec<PatientView>,
    pub skipped: Vec<SkippedRow>,
}

/// Header plus data rows, each tagged with its 1-based line in the sheet.
struct Sheet {
    headers: StringRecord,
    rows: Vec<(usize, Result<StringRecord, String>)>,
}

pub fn import_sheet(conn: &Connection, actor: &Actor, data: &[u8]) -> Result<ImportReport, ApiError> {
    let sheet = if is_workbook(data) {
        read_workbook(data)?
    } else {
        read_csv(data)?
    };
    if !sheet.headers.iter().any(|h| h == "first_name") {
        return Err(ApiError::BadRequest(
            "Spreadsheet has no first_name column".into(),
        ));
    }

    let mut report = ImportReport {
        imported: 0,
        patients: Vec::new(),
        skipped: Vec::new(),
    };

    for (row, record) in sheet.rows {
        let parsed = record
            .and_then(|r| {
                r.deserialize::<ImportRow>(Some(&sheet.headers))
                    .map_err(|e| format!("unreadable row: {e}"))
            })
            .and_then(to_new_patient);
        let input = match parsed {
            Ok(input) => input,
            Err(reason) => {
                report.skipped.push(SkippedRow { row, reason });
                continue;
            }
        };

        match patients::create(conn, actor, input) {
            Ok(view) => {
                report.imported += 1;
                if report.patients.len() < PREVIEW_LIMIT {
                    report.patients.push(view);
                }
            }
            Err(ApiError::BadRequest(reason)) | Err(ApiError::Conflict(reason)) => {
                report.skipped.push(SkippedRow { row, reason });
            }
            Err(other) => return Err(other),
        }
    }

    tracing::info!(
        imported = report.imported,
        skipped = report.skipped.len(),
        by = actor.user_id,
        "Patient import finished"
    );
    Ok(report)
}

fn is_workbook(data: &[u8]) -> bool {
    data.starts_with(ZIP_MAGIC) || data.starts_with(OLE_MAGIC)
}

fn read_csv(data: &[u8]) -> Result<Sheet, ApiError> {
    let data = data.strip_prefix("\u{feff}".as_bytes()).unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| ApiError::BadRequest(format!("Unreadable spreadsheet: {e}")))?
        .clone();
    let rows = reader
        .records()
        .enumerate()
        .map(|(index, record)| (index + 2, record.map_err(|e| format!("unreadable row: {e}"))))
        .collect();
    Ok(Sheet { headers, rows })
}

fn read_workbook(data: &[u8]) -> Result<Sheet, ApiError> {
    let unreadable = |e: calamine::Error| ApiError::BadRequest(format!("Unreadable spreadsheet: {e}"));
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(data)).map_err(unreadable)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ApiError::BadRequest("Workbook has no worksheets".into()))?
        .map_err(unreadable)?;

    // Line numbers follow the sheet even when the used range starts below row 1.
    let first_line = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut lines = range.rows();
    let headers = lines.next().map(cells_to_record).unwrap_or_default();
    let rows = lines
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|cell| !cell.is_empty()))
        .map(|(index, cells)| (first_line + index + 1, Ok(cells_to_record(cells))))
        .collect();
    Ok(Sheet { headers, rows })
}

fn cells_to_record(cells: &[Data]) -> StringRecord {
    cells.iter().map(cell_text).collect()
}

/// Cell as the text a CSV export would carry. Whole numbers lose their
/// `.0` (national ids and phone numbers are often typed as numbers) and
/// date cells become `YYYY-MM-DD`.
fn cell_text(cell: &Data) -> String {
    let text = match cell {
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    text.trim().to_string()
}

fn to_new_patient(row: ImportRow) -> Result<NewPatient, String> {
    let mut missing = Vec::new();
    for (field, value) in [
        ("first_name", &row.first_name),
        ("last_name", &row.last_name),
        ("gender", &row.gender),
    ] {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            missing.push(field);
        }
    }
    if !missing.is_empty() {
        return Err(format!("missing {}", missing.join(", ")));
    }

    let raw_gender = row.gender.unwrap_or_default();
    let gender: Gender = raw_gender
        .trim()
        .parse()
        .map_err(|_| format!("invalid gender: {raw_gender}"))?;

    Ok(NewPatient {
        tc_identity_number: row.tc_identity_number,
        registration_number: row.registration_number,
        passport_number: row.passport_number,
        first_name: row.first_name,
        last_name: row.last_name,
        birth_date: row.birth_date,
        gender: Some(gender),
        mother_name: row.mother_name,
        father_name: row.father_name,
        mobile_phone: row.mobile_phone,
        home_phone: row.home_phone,
        email: row.email,
        address: row.address,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{self, fixtures};
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Role;
    use crate::models::PatientFilter;

    const SHEET: &str = "\
first_name,last_name,gender,tc_identity_number,birth_date,mobile_phone
Ayşe,Yılmaz,Kadın,10000000001,1985-04-12,05551110001
Mehmet,Demir,Erkek,10000000002,17.05.1990,
Fatma,Kaya,Kadın,,,
Ali,Çelik,Erkek,,,
Zeynep,Şahin,Kadın,,,
Hasan,Aydın,,,,
Elif,Koç,,10000000007,,
";

    fn actor(conn: &Connection) -> Actor {
        Actor::from_user(&fixtures::user(conn, "kayit", Role::User))
    }

    #[test]
    fn rows_without_gender_are_skipped_not_fatal() {
        let conn = open_memory_database().unwrap();
        let report = import_sheet(&conn, &actor(&conn), SHEET.as_bytes()).unwrap();

        assert_eq!(report.imported, 5);
        assert_eq!(report.patients.len(), 5);
        assert_eq!(repository::list_patients(&conn, &PatientFilter::default()).unwrap().len(), 5);

        let rows: Vec<usize> = report.skipped.iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![7, 8]);
        assert_eq!(report.skipped[0].reason, "missing gender");
    }

    #[test]
    fn preview_is_capped() {
        let conn = open_memory_database().unwrap();
        let mut sheet = String::from("first_name,last_name,gender\n");
        for i in 0..8 {
            sheet.push_str(&format!("Kişi{i},Test,Diğer\n"));
        }
        let report = import_sheet(&conn, &actor(&conn), sheet.as_bytes()).unwrap();
        assert_eq!(report.imported, 8);
        assert_eq!(report.patients.len(), PREVIEW_LIMIT);
    }

    #[test]
    fn duplicate_and_invalid_rows_are_reported() {
        let conn = open_memory_database().unwrap();
        let who = actor(&conn);
        fixtures::patient(&conn, "Mevcut", Some("10000000001"));

        let sheet = "\u{feff}first_name,last_name,gender,tc_identity_number,birth_date\n\
                     Ayşe,Yılmaz,Kadın,10000000001,\n\
                     Ali,Veli,erkek,,\n\
                     Can,Tan,Erkek,,31.02.1990\n\
                     Ece,Su,Kadın,,\n";
        let report = import_sheet(&conn, &who, sheet.as_bytes()).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped.len(), 3);
        assert!(report.skipped[0].reason.contains("already exists"));
        assert!(report.skipped[1].reason.starts_with("invalid gender"));
        assert!(report.skipped[2].reason.starts_with("Invalid birth_date"));
    }

    /// Build an xlsx in memory; empty strings leave the cell blank.
    fn workbook(rows: &[&[&str]]) -> rust_xlsxwriter::Workbook {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, cells) in rows.iter().enumerate() {
            for (c, text) in cells.iter().enumerate() {
                if !text.is_empty() {
                    sheet.write_string(r as u32, c as u16, *text).unwrap();
                }
            }
        }
        workbook
    }

    #[test]
    fn xlsx_workbook_is_imported() {
        let conn = open_memory_database().unwrap();
        let mut book = workbook(&[
            &["first_name", "last_name", "gender", "tc_identity_number", "birth_date"],
            &["Ayşe", "Yılmaz", "Kadın", "", ""],
            &["Mehmet", "Demir", "Erkek", "10000000002", "17.05.1990"],
            &["", "", "", "", ""],
            &["Hasan", "Aydın", "", "", ""],
        ]);
        let sheet = book.worksheet_from_index(0).unwrap();
        // National ids typed as numbers and real date cells.
        sheet.write_number(1, 3, 10000000001.0).unwrap();
        let birth = rust_xlsxwriter::ExcelDateTime::from_ymd(1985, 4, 12).unwrap();
        let date_format = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd");
        sheet.write_datetime_with_format(1, 4, &birth, &date_format).unwrap();
        let data = book.save_to_buffer().unwrap();

        let report = import_sheet(&conn, &actor(&conn), &data).unwrap();
        assert_eq!(report.imported, 2);
        let ayse = &report.patients[0].patient;
        assert_eq!(ayse.tc_identity_number.as_deref(), Some("10000000001"));
        assert_eq!(ayse.birth_date, chrono::NaiveDate::from_ymd_opt(1985, 4, 12));
        assert_eq!(
            report.patients[1].patient.birth_date,
            chrono::NaiveDate::from_ymd_opt(1990, 5, 17)
        );

        // The blank line is not reported; Hasan sits on line 5.
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].row, 5);
        assert_eq!(report.skipped[0].reason, "missing gender");
    }

    #[test]
    fn workbook_without_expected_header_is_rejected() {
        let conn = open_memory_database().unwrap();
        let data = workbook(&[&["ad", "soyad"], &["Ayse", "Yilmaz"]]).save_to_buffer().unwrap();
        let err = import_sheet(&conn, &actor(&conn), &data).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn corrupt_workbook_is_bad_request() {
        let conn = open_memory_database().unwrap();
        let err = import_sheet(&conn, &actor(&conn), b"PK\x03\x04not really a zip").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn sheet_without_expected_header_is_rejected() {
        let conn = open_memory_database().unwrap();
        let err = import_sheet(&conn, &actor(&conn), b"ad,soyad\nAyse,Yilmaz\n").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
