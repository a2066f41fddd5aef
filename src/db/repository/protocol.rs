use rusqlite::{params, Connection, OptionalExtension, Row};

use super::FilterQuery;
use crate::db::DatabaseError;
use crate::models::dates::now_timestamp;
use crate::models::*;

const PROTOCOL_COLUMNS: &str = "id, protocol_number, patient_id, examination_type_id, company_id,
     protocol_date, receipt_number, ledger_number, total_amount, discount_amount, paid_amount,
     status, created_by, created_at, updated_at";

const PROTOCOL_SERVICE_COLUMNS: &str =
    "id, protocol_id, service_id, price, created_at, updated_at";

/// Rows that still reference a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolDependents {
    pub services: i64,
    pub payments: i64,
}

impl ProtocolDependents {
    pub fn is_empty(&self) -> bool {
        self.services == 0 && self.payments == 0
    }
}

pub fn insert_protocol(conn: &Connection, protocol: &Protocol) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO protocols (protocol_number, patient_id, examination_type_id, company_id,
         protocol_date, receipt_number, ledger_number, total_amount, discount_amount,
         paid_amount, status, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            protocol.protocol_number,
            protocol.patient_id,
            protocol.examination_type_id,
            protocol.company_id,
            protocol.protocol_date,
            protocol.receipt_number,
            protocol.ledger_number,
            protocol.total_amount,
            protocol.discount_amount,
            protocol.paid_amount,
            protocol.status,
            protocol.created_by,
            protocol.created_at,
            protocol.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_protocol(conn: &Connection, id: i64) -> Result<Option<Protocol>, DatabaseError> {
    let protocol = conn
        .query_row(
            &format!("SELECT {PROTOCOL_COLUMNS} FROM protocols WHERE id = ?1"),
            params![id],
            protocol_from_row,
        )
        .optional()?;
    Ok(protocol)
}

pub fn list_protocols(conn: &Connection, filter: &ProtocolFilter) -> Result<Vec<Protocol>, DatabaseError> {
    let mut q = FilterQuery::new();
    q.date_range("protocol_date", filter.start_date, filter.end_date);
    q.eq("patient_id", filter.patient_id);
    q.eq("company_id", filter.company_id);
    q.eq("examination_type_id", filter.examination_type_id);
    q.eq("status", filter.status.clone());

    let sql = format!(
        "SELECT {PROTOCOL_COLUMNS} FROM protocols{} ORDER BY protocol_date DESC, id DESC",
        q.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let protocols = stmt
        .query_map(q.param_refs().as_slice(), protocol_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(protocols)
}

pub fn update_protocol(conn: &Connection, protocol: &Protocol) -> Result<(), DatabaseError> {
    // paid_amount is owned by the payment aggregate and never written here.
    let changed = conn.execute(
        "UPDATE protocols SET examination_type_id = ?1, company_id = ?2, protocol_date = ?3,
         receipt_number = ?4, ledger_number = ?5, total_amount = ?6, discount_amount = ?7,
         status = ?8, updated_at = ?9
         WHERE id = ?10",
        params![
            protocol.examination_type_id,
            protocol.company_id,
            protocol.protocol_date,
            protocol.receipt_number,
            protocol.ledger_number,
            protocol.total_amount,
            protocol.discount_amount,
            protocol.status,
            protocol.updated_at,
            protocol.id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Protocol", protocol.id));
    }
    Ok(())
}

pub fn delete_protocol(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM protocols WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Protocol", id));
    }
    Ok(())
}

/// Next `P<year><index>` number: one past the highest index already issued
/// for that year. Run inside a write transaction; the unique index on
/// `protocol_number` catches anything that still slips through.
pub fn next_protocol_number(conn: &Connection, year: i32) -> Result<String, DatabaseError> {
    let prefix = format!("P{year}");
    let max_index: Option<i64> = conn.query_row(
        "SELECT MAX(CAST(substr(protocol_number, ?2) AS INTEGER))
         FROM protocols
         WHERE substr(protocol_number, 1, ?3) = ?1",
        params![prefix, prefix.len() as i64 + 1, prefix.len() as i64],
        |row| row.get(0),
    )?;
    Ok(format!("{prefix}{:06}", max_index.unwrap_or(0) + 1))
}

/// Recompute `paid_amount` from the payments table and return it.
pub fn recompute_paid_amount(conn: &Connection, protocol_id: i64) -> Result<f64, DatabaseError> {
    let changed = conn.execute(
        "UPDATE protocols
         SET paid_amount = (SELECT COALESCE(ROUND(SUM(amount), 2), 0) FROM payments WHERE protocol_id = ?1),
             updated_at = ?2
         WHERE id = ?1",
        params![protocol_id, now_timestamp()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Protocol", protocol_id));
    }
    let paid = conn.query_row(
        "SELECT paid_amount FROM protocols WHERE id = ?1",
        params![protocol_id],
        |row| row.get(0),
    )?;
    Ok(paid)
}

pub fn count_protocol_dependents(conn: &Connection, protocol_id: i64) -> Result<ProtocolDependents, DatabaseError> {
    let dependents = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM protocol_services WHERE protocol_id = ?1),
                (SELECT COUNT(*) FROM payments WHERE protocol_id = ?1)",
        params![protocol_id],
        |row| {
            Ok(ProtocolDependents {
                services: row.get(0)?,
                payments: row.get(1)?,
            })
        },
    )?;
    Ok(dependents)
}

/// Remove everything hanging off a protocol: lab results and external
/// submissions of its services, the services, and its payments.
pub fn delete_protocol_dependents(conn: &Connection, protocol_id: i64) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM lab_results WHERE protocol_service_id IN
         (SELECT id FROM protocol_services WHERE protocol_id = ?1)",
        params![protocol_id],
    )?;
    conn.execute(
        "DELETE FROM external_lab_submissions WHERE protocol_service_id IN
         (SELECT id FROM protocol_services WHERE protocol_id = ?1)",
        params![protocol_id],
    )?;
    conn.execute(
        "DELETE FROM protocol_services WHERE protocol_id = ?1",
        params![protocol_id],
    )?;
    conn.execute("DELETE FROM payments WHERE protocol_id = ?1", params![protocol_id])?;
    Ok(())
}

fn protocol_from_row(row: &Row<'_>) -> rusqlite::Result<Protocol> {
    Ok(Protocol {
        id: row.get(0)?,
        protocol_number: row.get(1)?,
        patient_id: row.get(2)?,
        examination_type_id: row.get(3)?,
        company_id: row.get(4)?,
        protocol_date: row.get(5)?,
        receipt_number: row.get(6)?,
        ledger_number: row.get(7)?,
        total_amount: row.get(8)?,
        discount_amount: row.get(9)?,
        paid_amount: row.get(10)?,
        status: row.get(11)?,
        created_by: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

// ── Protocol services ───────────────────────────────────────

pub fn insert_protocol_service(conn: &Connection, ps: &ProtocolService) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO protocol_services (protocol_id, service_id, price, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![ps.protocol_id, ps.service_id, ps.price, ps.created_at, ps.updated_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_protocol_service(conn: &Connection, id: i64) -> Result<Option<ProtocolService>, DatabaseError> {
    let ps = conn
        .query_row(
            &format!("SELECT {PROTOCOL_SERVICE_COLUMNS} FROM protocol_services WHERE id = ?1"),
            params![id],
            protocol_service_from_row,
        )
        .optional()?;
    Ok(ps)
}

pub fn list_protocol_services(conn: &Connection) -> Result<Vec<ProtocolService>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROTOCOL_SERVICE_COLUMNS} FROM protocol_services ORDER BY id"
    ))?;
    let services = stmt
        .query_map([], protocol_service_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(services)
}

pub fn list_services_for_protocol(conn: &Connection, protocol_id: i64) -> Result<Vec<ProtocolService>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROTOCOL_SERVICE_COLUMNS} FROM protocol_services WHERE protocol_id = ?1 ORDER BY id"
    ))?;
    let services = stmt
        .query_map(params![protocol_id], protocol_service_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(services)
}

fn protocol_service_from_row(row: &Row<'_>) -> rusqlite::Result<ProtocolService> {
    Ok(ProtocolService {
        id: row.get(0)?,
        protocol_id: row.get(1)?,
        service_id: row.get(2)?,
        price: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
