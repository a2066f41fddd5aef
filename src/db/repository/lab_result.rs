use rusqlite::{params, Connection, OptionalExtension, Row};

use super::FilterQuery;
use crate::db::DatabaseError;
use crate::models::*;

const LAB_RESULT_COLUMNS: &str = "id, protocol_service_id, barcode_number, result, result_text,
     reference_range, unit, is_abnormal, sample_status_id, rejection_reason_id, external_lab_id,
     request_date, acceptance_date, acceptance_by, barcode_date, approval_date, approved_by,
     rejection_date, rejected_by, status, created_at, updated_at";

pub fn insert_lab_result(conn: &Connection, lab: &LabResult) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO lab_results (protocol_service_id, barcode_number, result, result_text,
         reference_range, unit, is_abnormal, sample_status_id, rejection_reason_id,
         external_lab_id, request_date, acceptance_date, acceptance_by, barcode_date,
         approval_date, approved_by, rejection_date, rejected_by, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20, ?21)",
        params![
            lab.protocol_service_id,
            lab.barcode_number,
            lab.result,
            lab.result_text,
            lab.reference_range,
            lab.unit,
            lab.is_abnormal,
            lab.sample_status_id,
            lab.rejection_reason_id,
            lab.external_lab_id,
            lab.request_date,
            lab.acceptance_date,
            lab.acceptance_by,
            lab.barcode_date,
            lab.approval_date,
            lab.approved_by,
            lab.rejection_date,
            lab.rejected_by,
            lab.status,
            lab.created_at,
            lab.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_lab_result(conn: &Connection, id: i64) -> Result<Option<LabResult>, DatabaseError> {
    let lab = conn
        .query_row(
            &format!("SELECT {LAB_RESULT_COLUMNS} FROM lab_results WHERE id = ?1"),
            params![id],
            lab_result_from_row,
        )
        .optional()?;
    Ok(lab)
}

pub fn list_lab_results(conn: &Connection, filter: &LabResultFilter) -> Result<Vec<LabResult>, DatabaseError> {
    let mut q = FilterQuery::new();
    q.eq("protocol_service_id", filter.protocol_service_id);
    q.eq("sample_status_id", filter.sample_status_id);
    q.eq("barcode_number", filter.barcode_number.clone());
    q.eq("status", filter.status.clone());
    q.eq("external_lab_id", filter.external_lab_id);

    let sql = format!(
        "SELECT {LAB_RESULT_COLUMNS} FROM lab_results{} ORDER BY id DESC",
        q.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let labs = stmt
        .query_map(q.param_refs().as_slice(), lab_result_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(labs)
}

pub fn update_lab_result(conn: &Connection, lab: &LabResult) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE lab_results SET barcode_number = ?1, result = ?2, result_text = ?3,
         reference_range = ?4, unit = ?5, is_abnormal = ?6, sample_status_id = ?7,
         rejection_reason_id = ?8, external_lab_id = ?9, request_date = ?10,
         acceptance_date = ?11, acceptance_by = ?12, barcode_date = ?13, approval_date = ?14,
         approved_by = ?15, rejection_date = ?16, rejected_by = ?17, status = ?18, updated_at = ?19
         WHERE id = ?20",
        params![
            lab.barcode_number,
            lab.result,
            lab.result_text,
            lab.reference_range,
            lab.unit,
            lab.is_abnormal,
            lab.sample_status_id,
            lab.rejection_reason_id,
            lab.external_lab_id,
            lab.request_date,
            lab.acceptance_date,
            lab.acceptance_by,
            lab.barcode_date,
            lab.approval_date,
            lab.approved_by,
            lab.rejection_date,
            lab.rejected_by,
            lab.status,
            lab.updated_at,
            lab.id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("LabResult", lab.id));
    }
    Ok(())
}

pub fn delete_lab_result(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM lab_results WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("LabResult", id));
    }
    Ok(())
}

fn lab_result_from_row(row: &Row<'_>) -> rusqlite::Result<LabResult> {
    Ok(LabResult {
        id: row.get(0)?,
        protocol_service_id: row.get(1)?,
        barcode_number: row.get(2)?,
        result: row.get(3)?,
        result_text: row.get(4)?,
        reference_range: row.get(5)?,
        unit: row.get(6)?,
        is_abnormal: row.get(7)?,
        sample_status_id: row.get(8)?,
        rejection_reason_id: row.get(9)?,
        external_lab_id: row.get(10)?,
        request_date: row.get(11)?,
        acceptance_date: row.get(12)?,
        acceptance_by: row.get(13)?,
        barcode_date: row.get(14)?,
        approval_date: row.get(15)?,
        approved_by: row.get(16)?,
        rejection_date: row.get(17)?,
        rejected_by: row.get(18)?,
        status: row.get(19)?,
        created_at: row.get(20)?,
        updated_at: row.get(21)?,
    })
}
