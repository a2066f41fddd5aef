use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const SUBMISSION_COLUMNS: &str = "id, protocol_service_id, external_lab_id, submission_date,
     expected_return_date, return_date, status, notes, created_at, updated_at";

pub fn insert_submission(conn: &Connection, sub: &ExternalLabSubmission) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO external_lab_submissions (protocol_service_id, external_lab_id,
         submission_date, expected_return_date, return_date, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            sub.protocol_service_id,
            sub.external_lab_id,
            sub.submission_date,
            sub.expected_return_date,
            sub.return_date,
            sub.status,
            sub.notes,
            sub.created_at,
            sub.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_submission(conn: &Connection, id: i64) -> Result<Option<ExternalLabSubmission>, DatabaseError> {
    let sub = conn
        .query_row(
            &format!("SELECT {SUBMISSION_COLUMNS} FROM external_lab_submissions WHERE id = ?1"),
            params![id],
            submission_from_row,
        )
        .optional()?;
    Ok(sub)
}

pub fn list_submissions(conn: &Connection) -> Result<Vec<ExternalLabSubmission>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM external_lab_submissions ORDER BY id"
    ))?;
    let subs = stmt
        .query_map([], submission_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(subs)
}

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<ExternalLabSubmission> {
    Ok(ExternalLabSubmission {
        id: row.get(0)?,
        protocol_service_id: row.get(1)?,
        external_lab_id: row.get(2)?,
        submission_date: row.get(3)?,
        expected_return_date: row.get(4)?,
        return_date: row.get(5)?,
        status: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
